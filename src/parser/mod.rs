//! Source parsing.
//!
//! [`Parser`] picks a [`MarkupEngine`] by file extension. Every engine shares
//! the same flow (see [`MarkupEngine::parse`]):
//!
//! ```text
//! read file
//!   ├─ default header present? ── yes ─► key=value lines up to `~~~~~~`
//!   │                            no  ─► engine header (e.g. YAML front matter)
//!   ├─ apply configured type/status defaults
//!   ├─ missing type or status ─► skip (logged)
//!   ├─ engine.validate() fails ─► skip (logged)
//!   ├─ normalize status, tags, date
//!   └─ engine.process_body() ─► Document
//! ```
//!
//! Provenance (`uri`, `sourceUri`, `sha1`, ...) is filled in by the crawler.

mod data;
mod html;
mod markdown;

pub use data::{DATA_FIELD, DataFileEngine};
pub use html::RawHtmlEngine;
pub use markdown::MarkdownEngine;

use crate::{
    config::SiteConfig,
    document::{Document, Status},
    engine::{Catalog, EngineRegistry, MissingPolicy},
    log,
    utils::date,
};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Built-in markup engine descriptor.
const MARKUP_ENGINES: &str = include_str!("markup_engines.properties");

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("engine {engine} for {file} could not be loaded: {reason}")]
    EngineUnavailable {
        engine: String,
        file: PathBuf,
        reason: String,
    },

    #[error("cannot read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid date `{value}` in {file} (expected `{format}`)")]
    InvalidDate {
        value: String,
        format: String,
        file: PathBuf,
    },

    #[error("invalid front matter in {0}: {1}")]
    FrontMatter(PathBuf, String),

    #[error("invalid data file {0}: {1}")]
    Data(PathBuf, String),
}

impl ParseError {
    /// Whether the failure only skips the file instead of failing the bake.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::InvalidDate { .. } | Self::FrontMatter(..))
    }
}

// ============================================================================
// Header
// ============================================================================

/// Raw metadata collected from a header, before normalization.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Header {
    pub doc_type: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub extra: BTreeMap<String, Value>,
}

impl Header {
    /// Store one header field; unknown keys go to `extra`.
    pub fn set(&mut self, key: &str, value: Value) {
        match key {
            "type" => self.doc_type = Some(value_to_string(&value)),
            "status" => self.status = Some(value_to_string(&value)),
            "title" => self.title = Some(value_to_string(&value)),
            "date" => self.date = Some(value_to_string(&value)),
            "tags" => {
                self.tags = match value {
                    Value::Array(items) => items.iter().map(value_to_string).collect(),
                    other => value_to_string(&other)
                        .split(',')
                        .map(String::from)
                        .collect(),
                }
            }
            _ => {
                self.extra.insert(key.to_owned(), value);
            }
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Per-file parsing state handed to engine hooks.
pub struct ParserContext<'a> {
    pub file: &'a Path,
    pub config: &'a SiteConfig,
    /// Whether the `key=value` header was found and consumed.
    pub has_header: bool,
    pub header: Header,
    /// Content after the header; HTML once `process_body` ran.
    pub body: String,
}

// ============================================================================
// MarkupEngine
// ============================================================================

/// Converts one kind of source file into a [`Document`].
pub trait MarkupEngine: Send + Sync {
    /// Engine-specific header, used when no default header was found.
    fn process_header(&self, _ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        Ok(())
    }

    /// Reject files the engine cannot handle after header processing.
    fn validate(&self, _ctx: &ParserContext<'_>) -> bool {
        true
    }

    /// Turn `ctx.body` into HTML.
    fn process_body(&self, ctx: &mut ParserContext<'_>) -> Result<(), ParseError>;

    /// Parse `file`. `Ok(None)` means the file is skipped.
    fn parse(&self, config: &SiteConfig, file: &Path) -> Result<Option<Document>, ParseError> {
        parse_with(self, config, file)
    }
}

/// The shared parse flow, usable from engines that override `parse`.
pub fn parse_with<E: MarkupEngine + ?Sized>(
    engine: &E,
    config: &SiteConfig,
    file: &Path,
) -> Result<Option<Document>, ParseError> {
    let content = fs::read_to_string(file).map_err(|err| ParseError::Io(file.to_path_buf(), err))?;
    let lines: Vec<&str> = content.lines().collect();

    let mut ctx = ParserContext {
        file,
        config,
        has_header: false,
        header: Header::default(),
        body: String::new(),
    };

    match header_length(&lines, config) {
        Some(separator) => {
            ctx.has_header = true;
            for line in &lines[..separator] {
                if let Some((key, value)) = line.split_once('=') {
                    ctx.header
                        .set(key.trim(), Value::String(value.trim().to_owned()));
                }
            }
            ctx.body = lines[separator + 1..].join("\n");
        }
        None => {
            ctx.body = content.clone();
            engine.process_header(&mut ctx)?;
        }
    }

    let content_config = &config.content;
    let doc_type = ctx
        .header
        .doc_type
        .clone()
        .or_else(|| content_config.default_type.clone());
    let status = ctx
        .header
        .status
        .clone()
        .or_else(|| content_config.default_status.clone());

    let (Some(doc_type), Some(status)) = (doc_type, status) else {
        log!("warn"; "{}: missing type or status in header, skipped", file.display());
        return Ok(None);
    };
    if !engine.validate(&ctx) {
        log!("warn"; "{}: rejected by its markup engine, skipped", file.display());
        return Ok(None);
    }
    let Some(status) = Status::parse(&status) else {
        log!("warn"; "{}: unknown status `{status}`, skipped", file.display());
        return Ok(None);
    };

    let date = match &ctx.header.date {
        Some(value) => date::parse_date(value, &content_config.date_format).ok_or_else(|| {
            ParseError::InvalidDate {
                value: value.clone(),
                format: content_config.date_format.clone(),
                file: file.to_path_buf(),
            }
        })?,
        None => date::modified(file).unwrap_or_else(date::now),
    };

    engine.process_body(&mut ctx)?;

    let mut doc = Document::new(doc_type.trim(), status, date);
    doc.title = ctx.header.title.take();
    doc.tags = normalize_tags(&ctx.header.tags, config.tags.sanitize);
    doc.extra = std::mem::take(&mut ctx.header.extra);
    doc.body = ctx.body;
    Ok(Some(doc))
}

/// Index of the separator line if the file starts with a default header.
///
/// Every non-empty line before the separator must be `key=value`, and `type`
/// and `status` must be present unless configured defaults cover them.
fn header_length(lines: &[&str], config: &SiteConfig) -> Option<usize> {
    let separator = &config.content.header_separator;
    let end = lines.iter().position(|line| line.trim() == separator)?;
    let head = &lines[..end];

    if head
        .iter()
        .any(|line| !line.trim().is_empty() && !line.contains('='))
    {
        return None;
    }

    let has_key = |wanted: &str| {
        head.iter()
            .filter_map(|line| line.split_once('='))
            .any(|(key, _)| key.trim() == wanted)
    };
    let type_found = has_key("type") || config.content.default_type.is_some();
    let status_found = has_key("status") || config.content.default_status.is_some();

    (type_found && status_found).then_some(end)
}

/// Trim tags, drop empty ones, optionally replace inner spaces with hyphens.
pub fn normalize_tags(tags: &[String], sanitize: bool) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            if sanitize {
                tag.replace(' ', "-")
            } else {
                tag.to_owned()
            }
        })
        .collect()
}

// ============================================================================
// Unavailable engine
// ============================================================================

/// Stand-in registered when an engine cannot be instantiated.
struct UnavailableEngine {
    identifier: String,
    reason: String,
}

impl MarkupEngine for UnavailableEngine {
    fn process_body(&self, ctx: &mut ParserContext<'_>) -> Result<(), ParseError> {
        Err(self.failure(ctx.file))
    }

    fn parse(&self, _config: &SiteConfig, file: &Path) -> Result<Option<Document>, ParseError> {
        Err(self.failure(file))
    }
}

impl UnavailableEngine {
    fn failure(&self, file: &Path) -> ParseError {
        ParseError::EngineUnavailable {
            engine: self.identifier.clone(),
            file: file.to_path_buf(),
            reason: self.reason.clone(),
        }
    }
}

fn unavailable(identifier: &str, reason: &str) -> Arc<dyn MarkupEngine> {
    Arc::new(UnavailableEngine {
        identifier: identifier.to_owned(),
        reason: reason.to_owned(),
    })
}

// ============================================================================
// Parser
// ============================================================================

/// Registry of markup engines keyed by source extension.
pub type MarkupEngines = EngineRegistry<dyn MarkupEngine>;

/// Build the markup engine registry for `config`.
pub fn markup_engines(config: &'static SiteConfig) -> MarkupEngines {
    let catalog = Catalog::new()
        .with("MarkdownEngine", move || MarkdownEngine::create(config))
        .with("RawHtmlEngine", || Ok(Arc::new(RawHtmlEngine) as Arc<dyn MarkupEngine>))
        .with("DataFileEngine", || Ok(Arc::new(DataFileEngine) as Arc<dyn MarkupEngine>));

    EngineRegistry::new(
        "markup engine",
        "markup_engines.properties",
        MARKUP_ENGINES,
        catalog,
        MissingPolicy::Sentinel(unavailable),
    )
    .with_search_dirs(config.build.plugins.clone())
}

/// Dispatches source files to markup engines by extension.
pub struct Parser {
    config: &'static SiteConfig,
    engines: Arc<MarkupEngines>,
}

impl Parser {
    pub fn new(config: &'static SiteConfig, engines: Arc<MarkupEngines>) -> Self {
        Self { config, engines }
    }

    /// Whether some engine handles `file`.
    pub fn supports(&self, file: &Path) -> bool {
        extension(file).is_some_and(|ext| self.engines.supports_extension(&ext))
    }

    /// Parse `file` with the engine registered for its extension.
    ///
    /// Files with an unknown extension are skipped (`Ok(None)`).
    pub fn process_file(&self, file: &Path) -> Result<Option<Document>, ParseError> {
        let Some(engine) = extension(file).and_then(|ext| self.engines.get(&ext)) else {
            return Ok(None);
        };
        engine.parse(self.config, file)
    }

    pub fn engines(&self) -> &MarkupEngines {
        &self.engines
    }
}

fn extension(file: &Path) -> Option<String> {
    file.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

// ============================================================================
// Tests
// ============================================================================
