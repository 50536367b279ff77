//! Data file engine.
//!
//! JSON, YAML and TOML files under the data folder become documents of the
//! configured data type. Their parsed content is stored under `data` and is
//! reachable from templates through the `data` extractor. Data documents are
//! never rendered on their own.

use super::{MarkupEngine, ParseError, ParserContext};
use crate::{
    config::SiteConfig,
    document::{Document, Status},
    utils::date,
};
use serde_json::Value;
use std::{fs, path::Path};

/// Key of the parsed content in a data document's `extra` map.
pub const DATA_FIELD: &str = "data";

pub struct DataFileEngine;

impl MarkupEngine for DataFileEngine {
    fn process_body(&self, _ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        Ok(())
    }

    fn parse(&self, config: &SiteConfig, file: &Path) -> Result<Option<Document>, ParseError> {
        let text = fs::read_to_string(file).map_err(|err| ParseError::Io(file.to_path_buf(), err))?;
        let invalid = |err: String| ParseError::Data(file.to_path_buf(), err);

        let extension = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let value: Value = match extension.as_str() {
            "json" => serde_json::from_str(&text).map_err(|err| invalid(err.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&text).map_err(|err| invalid(err.to_string()))?,
            "toml" => toml::from_str(&text).map_err(|err| invalid(err.to_string()))?,
            other => return Err(invalid(format!("unsupported data format `{other}`"))),
        };

        let modified = date::modified(file).unwrap_or_else(date::now);
        let mut doc = Document::new(&config.content.data_type, Status::Published, modified);
        doc.extra.insert(DATA_FIELD.to_owned(), value);
        doc.rendered = true;
        Ok(Some(doc))
    }
}
