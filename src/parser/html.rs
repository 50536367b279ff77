//! Raw HTML engine: the body is copied as is.

use super::{MarkupEngine, ParseError, ParserContext};

pub struct RawHtmlEngine;

impl MarkupEngine for RawHtmlEngine {
    /// HTML has no header syntax of its own, so the default header is required.
    fn validate(&self, ctx: &ParserContext<'_>) -> bool {
        ctx.has_header
    }

    fn process_body(&self, _ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        Ok(())
    }
}
