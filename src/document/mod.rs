//! Document records.
//!
//! A [`Document`] is created by a markup engine, completed with provenance by
//! the crawler and upserted into the content store. Apart from the renderer
//! setting `rendered` and the navigation links, records are never mutated in
//! place.
//!
//! Field names serialize in camelCase (`sourceUri`, `noExtensionUri`,
//! `nextContent`, ...) since that is what templates see.

pub mod types;

pub use types::{BUILTIN_TYPES, DocumentTypeListener, DocumentTypes};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};

/// Publication status after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Published,
}

impl Status {
    /// Normalize a header value. `published-date` collapses to `Published`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" | "published-date" => Some(Self::Published),
            _ => None,
        }
    }

    pub fn is_published(self) -> bool {
        self == Self::Published
    }
}

/// Projection of a neighbouring document used for previous/next links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavLink {
    pub uri: String,
    pub no_extension_uri: Option<String>,
    pub title: Option<String>,
}

/// A parsed content file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Site-relative output path, unique across the store.
    pub uri: String,
    pub no_extension_uri: Option<String>,
    /// Source path relative to its source folder.
    pub source_uri: String,
    pub file: PathBuf,
    /// Content hash of the source bytes.
    pub sha1: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub status: Status,
    pub date: NaiveDateTime,
    pub tags: Vec<String>,
    pub title: Option<String>,
    pub body: String,
    pub name: String,
    /// `../` once per directory level of `uri`.
    pub rootpath: String,
    pub rendered: bool,
    pub next_content: Option<NavLink>,
    pub previous_content: Option<NavLink>,
    /// Header fields without a dedicated slot.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Document {
    /// Record with the parsed fields set and provenance left empty.
    pub fn new(doc_type: &str, status: Status, date: NaiveDateTime) -> Self {
        Self {
            uri: String::new(),
            no_extension_uri: None,
            source_uri: String::new(),
            file: PathBuf::new(),
            sha1: String::new(),
            doc_type: doc_type.to_owned(),
            status,
            date,
            tags: Vec::new(),
            title: None,
            body: String::new(),
            name: String::new(),
            rootpath: String::new(),
            rendered: false,
            next_content: None,
            previous_content: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status.is_published()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Navigation projection of this document.
    pub fn nav_link(&self) -> NavLink {
        NavLink {
            uri: self.uri.clone(),
            no_extension_uri: self.no_extension_uri.clone(),
            title: self.title.clone(),
        }
    }
}

/// Relative path from a site-relative uri back to the site root.
pub fn rootpath_for(uri: &str) -> String {
    "../".repeat(uri.matches('/').count())
}
