//! Template models with lazily extracted entries.

use super::{Extracted, ModelError, ModelExtractors, ValueAdapter};
use crate::{config::SiteConfig, log, store::ContentStore};
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// Entries set explicitly by the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateModel {
    entries: BTreeMap<String, Value>,
}

impl TemplateModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_owned(), value);
    }

    /// Serialize `value` into the model under `key`.
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        self.set(key, serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

/// A [`TemplateModel`] that falls back to model extractors for unknown keys.
#[derive(Clone)]
pub struct LazyModel {
    model: TemplateModel,
    extractors: Arc<ModelExtractors>,
    store: Arc<dyn ContentStore>,
    config: &'static SiteConfig,
}

impl LazyModel {
    pub fn new(
        model: TemplateModel,
        extractors: Arc<ModelExtractors>,
        store: Arc<dyn ContentStore>,
        config: &'static SiteConfig,
    ) -> Self {
        Self {
            model,
            extractors,
            store,
            config,
        }
    }

    /// Resolve `key`: explicit entries first, then the extractor for it.
    ///
    /// `None` when neither exists. Extraction failures are logged and also
    /// resolve to `None`.
    pub fn get<A: ValueAdapter + ?Sized>(&self, key: &str, adapter: &A) -> Option<A::Output> {
        if let Some(value) = self.model.get(key) {
            return Some(adapter.plain(key, value));
        }

        match self
            .extractors
            .extract_and_transform(&self.store, self.config, key, &self.model, adapter)
        {
            Ok(value) => Some(value),
            Err(ModelError::NoExtractorForKey(_)) => None,
            Err(err) => {
                log!("warn"; "cannot resolve `{key}`: {err}");
                None
            }
        }
    }

    /// Whether `key` resolves to something.
    pub fn contains(&self, key: &str) -> bool {
        self.model.contains(key) || self.extractors.contains_key(key)
    }

    /// Explicit keys followed by extractor keys, without duplicates.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.model.iter().map(|(key, _)| key.clone()).collect();
        keys.extend(
            self.extractors
                .keys()
                .into_iter()
                .filter(|key| !self.model.contains(key)),
        );
        keys
    }

    pub fn entries(&self) -> &TemplateModel {
        &self.model
    }

    pub fn config(&self) -> &'static SiteConfig {
        self.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }
}

/// Adapter producing plain JSON values.
pub struct JsonAdapter;

impl ValueAdapter for JsonAdapter {
    type Output = Value;

    fn adapt(&self, _key: &str, raw: Extracted) -> Value {
        raw.to_json()
    }

    fn plain(&self, _key: &str, value: &Value) -> Value {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::{DocumentTypes, Status},
        model::tests::{doc, store},
        parser::tests::leak,
    };
    use serde_json::json;

    fn lazy(model: TemplateModel) -> LazyModel {
        let config = leak(SiteConfig::default());
        let extractors = Arc::new(ModelExtractors::new(Arc::new(DocumentTypes::new()), config));
        let store = store();
        store
            .add_document(doc("post", "hello", Status::Published, 1, &["rust"]))
            .unwrap();
        LazyModel::new(model, extractors, store, config)
    }

    #[test]
    fn test_explicit_entries_win() {
        let mut model = TemplateModel::new();
        model.set("posts", json!("overridden"));
        let lazy = lazy(model);

        assert_eq!(lazy.get("posts", &JsonAdapter), Some(json!("overridden")));
    }

    #[test]
    fn test_unknown_key_is_absent() {
        let lazy = lazy(TemplateModel::new());
        assert_eq!(lazy.get("nonsense", &JsonAdapter), None);
        assert!(!lazy.contains("nonsense"));
    }

    #[test]
    fn test_extracted_on_access() {
        let lazy = lazy(TemplateModel::new());
        let posts = lazy.get("published_posts", &JsonAdapter).unwrap();
        assert_eq!(posts[0]["title"], "hello");
        assert_eq!(lazy.get("alltags", &JsonAdapter), Some(json!(["rust"])));
    }

    #[test]
    fn test_keys_merge_without_duplicates() {
        let mut model = TemplateModel::new();
        model.set("content", json!({}));
        model.set("tags", json!([]));
        let lazy = lazy(model);

        let keys = lazy.keys();
        assert_eq!(&keys[..2], ["content", "tags"]);
        assert_eq!(keys.iter().filter(|key| *key == "tags").count(), 1);
        assert!(keys.contains(&"published_posts".to_string()));
    }

    #[test]
    fn test_insert_serializes() {
        let mut model = TemplateModel::new();
        model.insert("numbers", &[1, 2, 3]).unwrap();
        assert_eq!(model.get("numbers"), Some(&json!([1, 2, 3])));
    }
}
