//! Content store.
//!
//! Documents are partitioned by type. A partition must exist before a
//! document of that type can be added; new types create theirs through
//! [`ContentStore::evolve_schema`] (wired to the document type registry).
//!
//! Every list query returns documents newest first; equal dates fall back to
//! the source path so the order is stable between runs.

mod memory;

pub use memory::MemoryStore;

use crate::document::Document;
use std::{cmp::Ordering, collections::BTreeSet, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no partition for document type `{0}`")]
    UnknownType(String),

    #[error("uri `{uri}` of `{source_uri}` is already used by `{existing}`")]
    DuplicateUri {
        uri: String,
        source_uri: String,
        existing: String,
    },

    #[error("no document with uri `{0}`")]
    NotFound(String),

    #[error("cannot write content store `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("cannot serialize content store")]
    Json(#[from] serde_json::Error),
}

/// Query and update operations over stored documents.
pub trait ContentStore: Send + Sync {
    /// Create the partition for `doc_type` if it is missing.
    fn evolve_schema(&self, doc_type: &str);

    /// Types that have a partition.
    fn document_types(&self) -> Vec<String>;

    /// Insert or replace the document stored for the same source.
    fn add_document(&self, doc: Document) -> Result<(), StoreError>;

    fn find_by_source(&self, source_uri: &str) -> Option<Document>;

    fn find_by_uri(&self, uri: &str) -> Option<Document>;

    /// Every document of a type, drafts included.
    fn all_by_type(&self, doc_type: &str) -> Vec<Document>;

    fn published_by_type(&self, doc_type: &str) -> Vec<Document>;

    fn published_count(&self, doc_type: &str) -> usize {
        self.published_by_type(doc_type).len()
    }

    /// Documents that still need rendering, across all types.
    fn unrendered(&self) -> Vec<Document>;

    /// Published documents carrying `tag`, optionally limited to one type.
    fn published_by_tag(&self, tag: &str, doc_type: Option<&str>) -> Vec<Document>;

    /// Documents carrying `tag`, drafts included.
    fn all_by_tag(&self, tag: &str) -> Vec<Document>;

    /// Distinct tags of published documents.
    fn distinct_tags(&self) -> BTreeSet<String>;

    /// Store the navigation links of `doc` and flag it rendered.
    fn mark_rendered(&self, doc: &Document) -> Result<(), StoreError>;

    fn delete_by_source(&self, source_uri: &str) -> Option<Document>;

    /// Remove every document, keeping partitions.
    fn clear(&self);

    fn all_documents(&self) -> Vec<Document>;
}

/// Newest first, then by source path.
pub fn compare_by_date(a: &Document, b: &Document) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.source_uri.cmp(&b.source_uri))
}
