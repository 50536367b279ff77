//! Model extractors.
//!
//! Templates see derived collections (`posts`, `tags`, `published_content`,
//! ...) through extractors keyed by variable name. Extraction is lazy: a
//! value is only computed when a template asks for its key.
//!
//! ```text
//! template asks for `published_projects`
//!        │
//!        ▼
//! LazyModel ── explicit entry? ── yes ─► adapter.plain(value)
//!        │ no
//!        ▼
//! ModelExtractors ── key registered? ── no ─► absent
//!        │ yes
//!        ▼
//! extractor.extract(ctx, key) ─► Extracted ─► adapter.adapt(key, raw)
//! ```
//!
//! Each template engine supplies a [`ValueAdapter`] that only converts the
//! raw result into its own value type; the store queries live here.
//!
//! New document types gain `<type>s` and `published_<type>s` automatically
//! through [`ExtractorRegistrar`].

mod extractors;
mod lazy;

pub use extractors::{PublishedTypedDocuments, TypedDocuments, tag_uri};
pub use lazy::{JsonAdapter, LazyModel, TemplateModel};

use crate::{
    config::SiteConfig,
    document::{Document, DocumentTypeListener, DocumentTypes},
    engine::{Catalog, EngineRegistry, MissingPolicy},
    log,
    store::ContentStore,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Built-in model extractor descriptor.
const MODEL_EXTRACTORS: &str = include_str!("model_extractors.properties");

/// Model key holding the current page of a paginated index.
pub const CURRENT_PAGE: &str = "currentPageNumber";

/// Model key holding the tag a tag page is rendered for.
pub const TAG: &str = "tag";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("no model extractor registered for `{0}`")]
    NoExtractorForKey(String),

    #[error("unknown document type `{0}`")]
    UnsupportedType(String),
}

// ============================================================================
// Extracted values
// ============================================================================

/// One entry of the `tags` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEntry {
    pub name: String,
    pub uri: String,
    pub tagged_posts: Vec<Document>,
    pub tagged_documents: Vec<Document>,
}

/// Raw extractor output, before a template engine adapts it.
pub enum Extracted {
    Documents(Vec<Document>),
    Tags(Vec<TagEntry>),
    Names(Vec<String>),
    Date(NaiveDateTime),
    Data(Value),
    Store(Arc<dyn ContentStore>),
}

impl Extracted {
    /// Plain JSON rendering. The store becomes a `type → documents` map.
    pub fn to_json(&self) -> Value {
        let value = match self {
            Self::Documents(docs) => serde_json::to_value(docs),
            Self::Tags(tags) => serde_json::to_value(tags),
            Self::Names(names) => serde_json::to_value(names),
            Self::Date(date) => serde_json::to_value(date),
            Self::Data(value) => Ok(value.clone()),
            Self::Store(store) => {
                let types: serde_json::Map<String, Value> = store
                    .document_types()
                    .into_iter()
                    .map(|doc_type| {
                        let docs = serde_json::to_value(store.all_by_type(&doc_type))
                            .unwrap_or_default();
                        (doc_type, docs)
                    })
                    .collect();
                Ok(Value::Object(types))
            }
        };
        value.unwrap_or_default()
    }
}

/// Converts extracted values into a template engine's value type.
pub trait ValueAdapter {
    type Output;

    /// Adapt the output of the extractor registered for `key`.
    fn adapt(&self, key: &str, raw: Extracted) -> Self::Output;

    /// Adapt an entry that was set on the model explicitly.
    fn plain(&self, key: &str, value: &Value) -> Self::Output;
}

/// Everything an extractor may read.
pub struct ExtractContext<'a> {
    pub store: &'a Arc<dyn ContentStore>,
    pub types: &'a DocumentTypes,
    pub config: &'a SiteConfig,
    /// Entries set explicitly on the model (`tag`, `currentPageNumber`, ...).
    pub model: &'a TemplateModel,
}

/// Computes one template variable from the store.
pub trait ModelExtractor: Send + Sync {
    fn extract(&self, ctx: &ExtractContext<'_>, key: &str) -> Result<Extracted, ModelError>;
}

// ============================================================================
// Pluralization
// ============================================================================

/// `<type>s`, for registered types only.
pub fn pluralize(types: &DocumentTypes, doc_type: &str) -> Result<String, ModelError> {
    if types.contains(doc_type) {
        Ok(format!("{doc_type}s"))
    } else {
        Err(ModelError::UnsupportedType(doc_type.to_owned()))
    }
}

/// Strip exactly one trailing character and require a registered type.
pub fn unpluralize(types: &DocumentTypes, plural: &str) -> Result<String, ModelError> {
    let mut chars = plural.chars();
    chars.next_back();
    let singular = chars.as_str();

    if !singular.is_empty() && types.contains(singular) {
        Ok(singular.to_owned())
    } else {
        Err(ModelError::UnsupportedType(plural.to_owned()))
    }
}

// ============================================================================
// ModelExtractors
// ============================================================================

fn catalog() -> Catalog<dyn ModelExtractor> {
    use extractors::*;

    fn boxed(extractor: impl ModelExtractor + 'static) -> Result<Arc<dyn ModelExtractor>, String> {
        Ok(Arc::new(extractor))
    }

    Catalog::new()
        .with("TypedDocumentsExtractor", || boxed(TypedDocuments))
        .with("PublishedTypedDocumentsExtractor", || boxed(PublishedTypedDocuments))
        .with("PublishedPostsExtractor", || boxed(PublishedPosts))
        .with("PublishedContentExtractor", || boxed(PublishedContent))
        .with("AllContentExtractor", || boxed(AllContent))
        .with("AllTagsExtractor", || boxed(AllTags))
        .with("TagPostsExtractor", || boxed(TagPosts))
        .with("TaggedDocumentsExtractor", || boxed(TaggedDocuments))
        .with("TagsExtractor", || boxed(Tags))
        .with("DbExtractor", || boxed(Db))
        .with("PublishedDateExtractor", || boxed(PublishedDate))
        .with("DataExtractor", || boxed(DataFiles))
}

/// Registry of model extractors keyed by template variable name.
pub struct ModelExtractors {
    registry: EngineRegistry<dyn ModelExtractor>,
    types: Arc<DocumentTypes>,
}

impl ModelExtractors {
    pub fn new(types: Arc<DocumentTypes>, config: &SiteConfig) -> Self {
        let registry = EngineRegistry::new(
            "model extractor",
            "model_extractors.properties",
            MODEL_EXTRACTORS,
            catalog(),
            MissingPolicy::Skip,
        )
        .with_search_dirs(config.build.plugins.clone());

        Self { registry, types }
    }

    /// Register `<type>s` extractors for every type added from now on.
    pub fn listen(self: &Arc<Self>) {
        self.types.add_listener(Arc::new(ExtractorRegistrar {
            extractors: Arc::downgrade(self),
        }));
    }

    /// Run the extractor for `key` and adapt its result.
    pub fn extract_and_transform<A: ValueAdapter + ?Sized>(
        &self,
        store: &Arc<dyn ContentStore>,
        config: &SiteConfig,
        key: &str,
        model: &TemplateModel,
        adapter: &A,
    ) -> Result<A::Output, ModelError> {
        let extractor = self
            .registry
            .get(key)
            .ok_or_else(|| ModelError::NoExtractorForKey(key.to_owned()))?;

        let ctx = ExtractContext {
            store,
            types: &self.types,
            config,
            model,
        };
        let raw = extractor.extract(&ctx, key)?;
        Ok(adapter.adapt(key, raw))
    }

    /// Add `<type>s` and `published_<type>s` unless they already exist.
    pub fn register_extractors_for_custom_types(&self, doc_type: &str) -> Result<(), ModelError> {
        let plural = self.pluralize(doc_type)?;

        if !self.registry.supports_extension(&plural) {
            self.registry
                .register(&plural, "TypedDocumentsExtractor", Arc::new(TypedDocuments));
        }
        let published = format!("published_{plural}");
        if !self.registry.supports_extension(&published) {
            self.registry.register(
                &published,
                "PublishedTypedDocumentsExtractor",
                Arc::new(PublishedTypedDocuments),
            );
        }
        Ok(())
    }

    pub fn pluralize(&self, doc_type: &str) -> Result<String, ModelError> {
        pluralize(&self.types, doc_type)
    }

    pub fn unpluralize(&self, plural: &str) -> Result<String, ModelError> {
        unpluralize(&self.types, plural)
    }

    pub fn register(&self, key: &str, implementation: &str, extractor: Arc<dyn ModelExtractor>) {
        self.registry.register(key, implementation, extractor);
    }

    /// Drop custom registrations and reload the built-in set.
    pub fn reset(&self) {
        self.registry.reset();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.registry.supports_extension(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.registry.keys()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn types(&self) -> &Arc<DocumentTypes> {
        &self.types
    }

    pub fn registry(&self) -> &EngineRegistry<dyn ModelExtractor> {
        &self.registry
    }
}

/// Registers extractors for document types as they appear.
pub struct ExtractorRegistrar {
    extractors: Weak<ModelExtractors>,
}

impl DocumentTypeListener for ExtractorRegistrar {
    fn added(&self, _types: &DocumentTypes, doc_type: &str) {
        let Some(extractors) = self.extractors.upgrade() else {
            return;
        };
        if let Err(err) = extractors.register_extractors_for_custom_types(doc_type) {
            log!("warn"; "{err}");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
