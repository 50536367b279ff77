//! Rendering.
//!
//! Every document still flagged unrendered gets one output file; site-wide
//! artifacts (index, archive, feed, tag pages, sitemap, 404) are produced by
//! [`RenderingTool`]s.
//!
//! # Navigation
//!
//! Links are computed inside the document's own type, newest first:
//!
//! ```text
//! index:   0      1       2      3
//!          D4     D3   (draft)   D1
//!          ▲      │               ▲
//!   next ──┘      └── previous ───┘
//! ```
//!
//! Drafts are skipped over. The newest published document has no `next`,
//! the oldest has no `previous`.
//!
//! # Failures
//!
//! A failing document does not stop the others. All messages are returned
//! together as [`RenderError::Aggregate`] once every document was attempted.

mod tools;

pub use tools::{RenderingTool, tools};

use crate::{
    config::SiteConfig,
    document::{Document, NavLink, rootpath_for},
    log,
    model::{LazyModel, ModelExtractors, TemplateModel},
    store::{ContentStore, StoreError},
    template::{TemplateEngines, TemplateError, error_chain},
    utils::minify::minify,
};
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("cannot write `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot build template model")]
    Model(#[from] serde_json::Error),

    /// Every failure of a batch, one message per line.
    #[error("{}", errors.join("\n"))]
    Aggregate { attempted: usize, errors: Vec<String> },
}

/// Renders documents and artifacts through the template engines.
pub struct Renderer {
    config: &'static SiteConfig,
    store: Arc<dyn ContentStore>,
    extractors: Arc<ModelExtractors>,
    templates: Arc<TemplateEngines>,
    config_value: Value,
}

impl Renderer {
    pub fn new(
        config: &'static SiteConfig,
        store: Arc<dyn ContentStore>,
        extractors: Arc<ModelExtractors>,
        templates: Arc<TemplateEngines>,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            config,
            store,
            extractors,
            templates,
            config_value: serde_json::to_value(config)?,
        })
    }

    pub fn config(&self) -> &'static SiteConfig {
        self.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Render every unrendered document. Returns how many were rendered.
    pub fn render_documents(&self) -> Result<usize, RenderError> {
        let pending = self.store.unrendered();
        let mut by_type: FxHashMap<String, Vec<Document>> = FxHashMap::default();
        let mut errors = Vec::new();
        let mut rendered = 0;

        for mut doc in pending.iter().cloned() {
            let siblings = by_type
                .entry(doc.doc_type.clone())
                .or_insert_with(|| self.store.all_by_type(&doc.doc_type));
            let (previous, next) = navigation(siblings, &doc.source_uri);
            doc.previous_content = previous;
            doc.next_content = next;

            let outcome = self
                .render_document(&doc)
                .and_then(|()| self.store.mark_rendered(&doc).map_err(RenderError::from));
            match outcome {
                Ok(()) => rendered += 1,
                Err(err) => {
                    let message = error_chain(&err);
                    log!("error"; "{}: {message}", doc.source_uri);
                    errors.push(message);
                }
            }
        }

        if errors.is_empty() {
            Ok(rendered)
        } else {
            Err(RenderError::Aggregate {
                attempted: pending.len(),
                errors,
            })
        }
    }

    fn render_document(&self, doc: &Document) -> Result<(), RenderError> {
        let path = self.output_path(doc);
        self.remove_stale_variant(doc)?;

        let mut model = self.base_model();
        model.insert("content", doc)?;
        self.write(&doc.doc_type, model, &path)
    }

    /// `<output>/<uri without extension>[<draft suffix>]<output extension>`.
    pub fn output_path(&self, doc: &Document) -> PathBuf {
        self.variant_path(doc, doc.is_published())
    }

    fn variant_path(&self, doc: &Document, published: bool) -> PathBuf {
        let build = &self.config.build;
        let base = Path::new(&doc.uri).with_extension("");
        let suffix = if published { "" } else { build.draft_suffix.as_str() };
        build.output.join(format!(
            "{}{suffix}{}",
            base.to_string_lossy(),
            build.output_extension
        ))
    }

    /// A document that changed status leaves the other variant behind.
    fn remove_stale_variant(&self, doc: &Document) -> Result<(), RenderError> {
        let stale = self.variant_path(doc, !doc.is_published());
        match fs::remove_file(&stale) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(RenderError::Io(stale, err)),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Artifacts
    // ========================================================================

    /// Render the template for `key` into `<output>/<file>`.
    ///
    /// Unless the model already has one, `content` describes the artifact.
    pub fn render_artifact(&self, key: &str, file: &str, model: TemplateModel) -> Result<(), RenderError> {
        let mut full = self.base_model();
        full.set(
            "content",
            json!({
                "type": key,
                "uri": file,
                "rootpath": rootpath_for(file),
            }),
        );
        for (name, value) in model.iter() {
            full.set(name, value.clone());
        }

        self.write(key, full, &self.config.build.output.join(file))
    }

    fn base_model(&self) -> TemplateModel {
        let build = &self.config.build;
        let mut model = TemplateModel::new();
        model.set("config", self.config_value.clone());
        model.set(
            "renderer",
            json!({
                "templateFolder": build.templates.to_string_lossy(),
                "outputFolder": build.output.to_string_lossy(),
                "templateEngines": self.templates.registry().keys(),
            }),
        );
        model.set("version", json!(env!("CARGO_PKG_VERSION")));
        model
    }

    fn write(&self, key: &str, model: TemplateModel, path: &Path) -> Result<(), RenderError> {
        let model = LazyModel::new(
            model,
            Arc::clone(&self.extractors),
            Arc::clone(&self.store),
            self.config,
        );

        // Render fully before touching the output file.
        let mut buffer = Vec::new();
        self.templates.render(key, &model, &mut buffer)?;
        let content = minify(path, &buffer, self.config);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| RenderError::Io(parent.to_path_buf(), err))?;
        }
        fs::write(path, &*content).map_err(|err| RenderError::Io(path.to_path_buf(), err))
    }
}

/// Previous (older) and next (newer) published neighbours of `source_uri`
/// in a newest-first list.
pub fn navigation(siblings: &[Document], source_uri: &str) -> (Option<NavLink>, Option<NavLink>) {
    let Some(position) = siblings.iter().position(|doc| doc.source_uri == source_uri) else {
        return (None, None);
    };

    let previous = siblings[position + 1..]
        .iter()
        .find(|doc| doc.is_published())
        .map(Document::nav_link);
    let next = siblings[..position]
        .iter()
        .rev()
        .find(|doc| doc.is_published())
        .map(Document::nav_link);
    (previous, next)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        document::{DocumentTypes, Status},
        model::tests::{doc, store},
        parser::tests::leak,
        template::{
            TemplateEngine,
            tests::{EchoEngine, config_with_templates},
        },
    };
    use std::io::Write;

    struct FailingEngine;

    impl TemplateEngine for FailingEngine {
        fn render_document(
            &self,
            _model: &LazyModel,
            _template: &str,
            _writer: &mut dyn Write,
        ) -> Result<(), TemplateError> {
            Err(TemplateError::Render("fake exception".into()))
        }
    }

    /// Renderer over a temp site whose `.tera` templates are handled by `engine`.
    pub(crate) fn renderer_with(
        config: SiteConfig,
        engine: Arc<dyn TemplateEngine>,
    ) -> (Renderer, &'static SiteConfig) {
        let config = leak(config);
        let templates = TemplateEngines::new(config);
        templates.register("tera", "TestEngine", engine);
        let extractors = Arc::new(ModelExtractors::new(Arc::new(DocumentTypes::new()), config));
        let renderer = Renderer::new(config, store(), extractors, Arc::new(templates)).unwrap();
        (renderer, config)
    }

    pub(crate) const TEMPLATES: &[(&str, &str)] = &[
        ("post.tera", ""),
        ("page.tera", ""),
        ("masterindex.tera", ""),
        ("archive.tera", ""),
        ("feed.tera", ""),
        ("tag.tera", ""),
        ("tagsindex.tera", ""),
        ("sitemap.tera", ""),
        ("error404.tera", ""),
    ];

    fn nav_uri(link: &Option<NavLink>) -> Option<&str> {
        link.as_ref().map(|link| link.uri.as_str())
    }

    #[test]
    fn test_navigation_over_published_documents() {
        let (_dir, config) = config_with_templates(TEMPLATES);
        let (renderer, _) = renderer_with(config, Arc::new(EchoEngine));
        let store = renderer.store();
        for d in 1..=4 {
            store
                .add_document(doc("post", &format!("D{d}"), Status::Published, d, &[]))
                .unwrap();
        }

        assert_eq!(renderer.render_documents().unwrap(), 4);

        let get = |name: &str| store.find_by_source(&format!("{name}.md")).unwrap();
        let expected = [
            ("D4", Some("D3.html"), None),
            ("D3", Some("D2.html"), Some("D4.html")),
            ("D2", Some("D1.html"), Some("D3.html")),
            ("D1", None, Some("D2.html")),
        ];
        for (name, previous, next) in expected {
            let doc = get(name);
            assert!(doc.rendered);
            assert_eq!(nav_uri(&doc.previous_content), previous, "{name}.previous");
            assert_eq!(nav_uri(&doc.next_content), next, "{name}.next");
        }
        assert!(store.unrendered().is_empty());
    }

    #[test]
    fn test_navigation_skips_drafts() {
        let list = vec![
            doc("post", "newer", Status::Published, 3, &[]),
            doc("post", "draft", Status::Draft, 2, &[]),
            doc("post", "older", Status::Published, 1, &[]),
        ];

        let (previous, next) = navigation(&list, "newer.md");
        assert_eq!(nav_uri(&previous), Some("older.html"));
        assert_eq!(next, None);

        let (previous, next) = navigation(&list, "older.md");
        assert_eq!(previous, None);
        assert_eq!(nav_uri(&next), Some("newer.html"));

        assert_eq!(navigation(&list, "missing.md"), (None, None));
    }

    #[test]
    fn test_navigation_stays_within_type() {
        let (_dir, config) = config_with_templates(TEMPLATES);
        let (renderer, _) = renderer_with(config, Arc::new(EchoEngine));
        let store = renderer.store();
        store.add_document(doc("post", "p1", Status::Published, 1, &[])).unwrap();
        store.add_document(doc("page", "about", Status::Published, 2, &[])).unwrap();
        store.add_document(doc("post", "p2", Status::Published, 3, &[])).unwrap();

        renderer.render_documents().unwrap();
        let p2 = store.find_by_source("p2.md").unwrap();
        assert_eq!(nav_uri(&p2.previous_content), Some("p1.html"));
        let about = store.find_by_source("about.md").unwrap();
        assert_eq!((about.previous_content, about.next_content), (None, None));
    }

    #[test]
    fn test_failures_are_aggregated() {
        let (_dir, config) = config_with_templates(TEMPLATES);
        let (renderer, _) = renderer_with(config, Arc::new(FailingEngine));
        let store = renderer.store();
        store.add_document(doc("post", "a", Status::Published, 1, &[])).unwrap();
        store.add_document(doc("post", "b", Status::Published, 2, &[])).unwrap();

        let err = renderer.render_documents().unwrap_err();
        assert_eq!(err.to_string(), "fake exception\nfake exception");
        assert!(matches!(err, RenderError::Aggregate { attempted: 2, .. }));
        assert_eq!(store.unrendered().len(), 2);
    }

    /// Store that refuses to flag `b.md` rendered.
    struct RejectingStore(Arc<dyn ContentStore>);

    impl ContentStore for RejectingStore {
        fn evolve_schema(&self, doc_type: &str) {
            self.0.evolve_schema(doc_type)
        }
        fn document_types(&self) -> Vec<String> {
            self.0.document_types()
        }
        fn add_document(&self, doc: Document) -> Result<(), StoreError> {
            self.0.add_document(doc)
        }
        fn find_by_source(&self, source_uri: &str) -> Option<Document> {
            self.0.find_by_source(source_uri)
        }
        fn find_by_uri(&self, uri: &str) -> Option<Document> {
            self.0.find_by_uri(uri)
        }
        fn all_by_type(&self, doc_type: &str) -> Vec<Document> {
            self.0.all_by_type(doc_type)
        }
        fn published_by_type(&self, doc_type: &str) -> Vec<Document> {
            self.0.published_by_type(doc_type)
        }
        fn unrendered(&self) -> Vec<Document> {
            self.0.unrendered()
        }
        fn published_by_tag(&self, tag: &str, doc_type: Option<&str>) -> Vec<Document> {
            self.0.published_by_tag(tag, doc_type)
        }
        fn all_by_tag(&self, tag: &str) -> Vec<Document> {
            self.0.all_by_tag(tag)
        }
        fn distinct_tags(&self) -> std::collections::BTreeSet<String> {
            self.0.distinct_tags()
        }
        fn mark_rendered(&self, doc: &Document) -> Result<(), StoreError> {
            if doc.source_uri == "b.md" {
                return Err(StoreError::NotFound(doc.uri.clone()));
            }
            self.0.mark_rendered(doc)
        }
        fn delete_by_source(&self, source_uri: &str) -> Option<Document> {
            self.0.delete_by_source(source_uri)
        }
        fn clear(&self) {
            self.0.clear()
        }
        fn all_documents(&self) -> Vec<Document> {
            self.0.all_documents()
        }
    }

    #[test]
    fn test_store_failure_does_not_stop_the_batch() {
        let (_dir, config) = config_with_templates(TEMPLATES);
        let config = leak(config);
        let templates = TemplateEngines::new(config);
        templates.register("tera", "TestEngine", Arc::new(EchoEngine));
        let extractors = Arc::new(ModelExtractors::new(Arc::new(DocumentTypes::new()), config));
        let store: Arc<dyn ContentStore> = Arc::new(RejectingStore(store()));
        let renderer =
            Renderer::new(config, Arc::clone(&store), extractors, Arc::new(templates)).unwrap();

        store.add_document(doc("post", "a", Status::Published, 1, &[])).unwrap();
        store.add_document(doc("post", "b", Status::Published, 2, &[])).unwrap();

        let err = renderer.render_documents().unwrap_err();
        assert_eq!(err.to_string(), "no document with uri `b.html`");
        assert!(matches!(err, RenderError::Aggregate { attempted: 2, .. }));

        assert!(store.find_by_source("a.md").unwrap().rendered);
        assert!(config.build.output.join("a.html").is_file());
        assert_eq!(store.unrendered().len(), 1);
    }

    #[test]
    fn test_output_paths_and_stale_variants() {
        let (dir, config) = config_with_templates(TEMPLATES);
        let (renderer, config) = renderer_with(config, Arc::new(EchoEngine));
        let store = renderer.store();

        let mut post = doc("post", "blog/hello", Status::Draft, 1, &[]);
        post.rootpath = rootpath_for(&post.uri);
        store.add_document(post.clone()).unwrap();
        renderer.render_documents().unwrap();

        let draft = config.build.output.join("blog/hello-draft.html");
        let published = config.build.output.join("blog/hello.html");
        assert!(draft.is_file());
        assert!(!published.exists());
        let out = fs::read_to_string(&draft).unwrap();
        assert!(out.starts_with("post.tera:"));
        assert!(out.contains("\"rootpath\":\"../\""));

        post.status = Status::Published;
        store.add_document(post).unwrap();
        renderer.render_documents().unwrap();
        assert!(published.is_file());
        assert!(!draft.exists());
        drop(dir);
    }

    #[test]
    fn test_missing_template_is_a_document_failure() {
        let (_dir, config) = config_with_templates(&[("post.tera", "")]);
        let (renderer, _) = renderer_with(config, Arc::new(EchoEngine));
        let store = renderer.store();
        store.add_document(doc("page", "about", Status::Published, 1, &[])).unwrap();
        store.add_document(doc("post", "hello", Status::Published, 1, &[])).unwrap();

        let err = renderer.render_documents().unwrap_err();
        let RenderError::Aggregate { attempted, errors } = err else {
            panic!("expected aggregate error");
        };
        assert_eq!(attempted, 2);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("page.tera"));
        assert!(store.find_by_source("hello.md").unwrap().rendered);
    }
}
