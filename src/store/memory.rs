//! In-memory store persisted as a JSON snapshot.
//!
//! The snapshot lives at `<cache>/content-store.json` and carries a format
//! version plus the signature of the template folder it was rendered with.
//! A missing, corrupt or outdated snapshot loads as an empty store.

use super::{ContentStore, StoreError, compare_by_date};
use crate::{document::Document, log};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

const SNAPSHOT_FILE: &str = "content-store.json";
const SNAPSHOT_VERSION: u32 = 1;

type Partitions = BTreeMap<String, BTreeMap<String, Document>>;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    template_signature: Option<String>,
    partitions: BTreeMap<String, Vec<Document>>,
}

/// Thread-safe document store keyed by type, then source path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<Partitions>,
    template_signature: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the snapshot in `cache_dir`, or start empty.
    pub fn load(cache_dir: &Path) -> Self {
        let path = cache_dir.join(SNAPSHOT_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::new();
        };

        let snapshot: Snapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log!("warn"; "ignoring unreadable content store `{}`: {err}", path.display());
                return Self::new();
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            return Self::new();
        }

        let partitions = snapshot
            .partitions
            .into_iter()
            .map(|(doc_type, docs)| {
                let docs = docs
                    .into_iter()
                    .map(|doc| (doc.source_uri.clone(), doc))
                    .collect();
                (doc_type, docs)
            })
            .collect();

        Self {
            partitions: RwLock::new(partitions),
            template_signature: RwLock::new(snapshot.template_signature),
        }
    }

    /// Write the snapshot into `cache_dir`.
    pub fn save(&self, cache_dir: &Path) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            template_signature: self.template_signature.read().clone(),
            partitions: self
                .partitions
                .read()
                .iter()
                .map(|(doc_type, docs)| (doc_type.clone(), docs.values().cloned().collect()))
                .collect(),
        };
        let json = serde_json::to_string(&snapshot)?;

        fs::create_dir_all(cache_dir).map_err(|err| StoreError::Io(cache_dir.to_path_buf(), err))?;
        let path = cache_dir.join(SNAPSHOT_FILE);
        fs::write(&path, json).map_err(|err| StoreError::Io(path, err))
    }

    pub fn template_signature(&self) -> Option<String> {
        self.template_signature.read().clone()
    }

    pub fn set_template_signature(&self, signature: String) {
        *self.template_signature.write() = Some(signature);
    }

    fn collect(&self, filter: impl Fn(&Document) -> bool) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .partitions
            .read()
            .values()
            .flat_map(BTreeMap::values)
            .filter(|doc| filter(*doc))
            .cloned()
            .collect();
        docs.sort_by(compare_by_date);
        docs
    }

    fn collect_type(&self, doc_type: &str, filter: impl Fn(&Document) -> bool) -> Vec<Document> {
        let partitions = self.partitions.read();
        let Some(docs) = partitions.get(doc_type) else {
            return Vec::new();
        };
        let mut docs: Vec<Document> = docs.values().filter(|doc| filter(*doc)).cloned().collect();
        docs.sort_by(compare_by_date);
        docs
    }
}

impl ContentStore for MemoryStore {
    fn evolve_schema(&self, doc_type: &str) {
        self.partitions
            .write()
            .entry(doc_type.to_owned())
            .or_default();
    }

    fn document_types(&self) -> Vec<String> {
        self.partitions.read().keys().cloned().collect()
    }

    fn add_document(&self, doc: Document) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write();

        if !partitions.contains_key(&doc.doc_type) {
            return Err(StoreError::UnknownType(doc.doc_type));
        }

        let clash = partitions
            .values()
            .flat_map(BTreeMap::values)
            .find(|other| other.uri == doc.uri && other.source_uri != doc.source_uri);
        if let Some(existing) = clash {
            return Err(StoreError::DuplicateUri {
                uri: doc.uri.clone(),
                source_uri: doc.source_uri.clone(),
                existing: existing.source_uri.clone(),
            });
        }

        // The type may have changed since the last crawl.
        for docs in partitions.values_mut() {
            docs.remove(&doc.source_uri);
        }
        if let Some(docs) = partitions.get_mut(&doc.doc_type) {
            docs.insert(doc.source_uri.clone(), doc);
        }
        Ok(())
    }

    fn find_by_source(&self, source_uri: &str) -> Option<Document> {
        self.partitions
            .read()
            .values()
            .find_map(|docs| docs.get(source_uri).cloned())
    }

    fn find_by_uri(&self, uri: &str) -> Option<Document> {
        self.partitions
            .read()
            .values()
            .flat_map(BTreeMap::values)
            .find(|doc| doc.uri == uri)
            .cloned()
    }

    fn all_by_type(&self, doc_type: &str) -> Vec<Document> {
        self.collect_type(doc_type, |_| true)
    }

    fn published_by_type(&self, doc_type: &str) -> Vec<Document> {
        self.collect_type(doc_type, Document::is_published)
    }

    fn unrendered(&self) -> Vec<Document> {
        self.collect(|doc| !doc.rendered)
    }

    fn published_by_tag(&self, tag: &str, doc_type: Option<&str>) -> Vec<Document> {
        let matches = |doc: &Document| doc.is_published() && doc.has_tag(tag);
        match doc_type {
            Some(doc_type) => self.collect_type(doc_type, matches),
            None => self.collect(matches),
        }
    }

    fn all_by_tag(&self, tag: &str) -> Vec<Document> {
        self.collect(|doc| doc.has_tag(tag))
    }

    fn distinct_tags(&self) -> BTreeSet<String> {
        self.partitions
            .read()
            .values()
            .flat_map(BTreeMap::values)
            .filter(|doc| doc.is_published())
            .flat_map(|doc| doc.tags.iter().cloned())
            .collect()
    }

    fn mark_rendered(&self, doc: &Document) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write();
        let stored = partitions
            .get_mut(&doc.doc_type)
            .and_then(|docs| docs.get_mut(&doc.source_uri))
            .ok_or_else(|| StoreError::NotFound(doc.uri.clone()))?;

        stored.rendered = true;
        stored.previous_content = doc.previous_content.clone();
        stored.next_content = doc.next_content.clone();
        Ok(())
    }

    fn delete_by_source(&self, source_uri: &str) -> Option<Document> {
        self.partitions
            .write()
            .values_mut()
            .find_map(|docs| docs.remove(source_uri))
    }

    fn clear(&self) {
        for docs in self.partitions.write().values_mut() {
            docs.clear();
        }
    }

    fn all_documents(&self) -> Vec<Document> {
        self.collect(|_| true)
    }
}

// ============================================================================
// Tests
// ============================================================================
