//! Markdown engine.
//!
//! Files may start with the default `key=value` header or with YAML front
//! matter fenced by `---` lines. The body is rendered with pulldown-cmark
//! using the extensions listed in `[markdown].extensions`.

use super::{MarkupEngine, ParseError, ParserContext};
use crate::config::SiteConfig;
use std::sync::Arc;

const FENCE: &str = "---";

pub struct MarkdownEngine {
    #[cfg(feature = "markdown")]
    options: pulldown_cmark::Options,
}

impl MarkdownEngine {
    #[cfg(feature = "markdown")]
    pub fn create(config: &SiteConfig) -> Result<Arc<dyn MarkupEngine>, String> {
        Ok(Arc::new(Self {
            options: options_for(&config.markdown.extensions)?,
        }))
    }

    #[cfg(not(feature = "markdown"))]
    pub fn create(_config: &SiteConfig) -> Result<Arc<dyn MarkupEngine>, String> {
        Err("built without the `markdown` feature (pulldown-cmark)".into())
    }
}

#[cfg(feature = "markdown")]
fn options_for(extensions: &[String]) -> Result<pulldown_cmark::Options, String> {
    use pulldown_cmark::Options;

    let mut options = Options::empty();
    for extension in extensions {
        options |= match extension.as_str() {
            "tables" => Options::ENABLE_TABLES,
            "strikethrough" => Options::ENABLE_STRIKETHROUGH,
            "footnotes" => Options::ENABLE_FOOTNOTES,
            "tasklists" => Options::ENABLE_TASKLISTS,
            "smart_punctuation" => Options::ENABLE_SMART_PUNCTUATION,
            "heading_attributes" => Options::ENABLE_HEADING_ATTRIBUTES,
            other => return Err(format!("unknown markdown extension `{other}`")),
        };
    }
    Ok(options)
}

impl MarkupEngine for MarkdownEngine {
    fn process_header(&self, ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        let Some((front_matter, body)) = split_front_matter(&ctx.body) else {
            return Ok(());
        };

        let value: serde_json::Value = serde_yaml::from_str(front_matter)
            .map_err(|err| ParseError::FrontMatter(ctx.file.to_path_buf(), err.to_string()))?;
        let serde_json::Value::Object(fields) = value else {
            return Err(ParseError::FrontMatter(
                ctx.file.to_path_buf(),
                "expected a mapping".into(),
            ));
        };

        let body = body.to_owned();
        for (key, value) in fields {
            ctx.header.set(&key, value);
        }
        ctx.body = body;
        Ok(())
    }

    #[cfg(feature = "markdown")]
    fn process_body(&self, ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        let parser = pulldown_cmark::Parser::new_ext(&ctx.body, self.options);
        let mut html = String::with_capacity(ctx.body.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, parser);
        ctx.body = html;
        Ok(())
    }

    #[cfg(not(feature = "markdown"))]
    fn process_body(&self, _ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        Ok(())
    }
}

/// Split `---` fenced front matter from the rest of the text.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix(FENCE)?
        .strip_prefix('\n')
        .or_else(|| text.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
