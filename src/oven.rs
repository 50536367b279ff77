//! Bake orchestration.
//!
//! ```text
//! Oven::new
//!   ├─ content store (cached snapshot, or empty on reset)
//!   ├─ template signature changed? ─► drop cached documents
//!   ├─ document types ──listeners──► store partitions, `<type>s` extractors
//!   └─ custom types from config + data type
//!
//! Oven::bake
//!   crawl content ─► crawl data ─► render documents ─► rendering tools
//!     ─► copy assets ─► save store
//! ```
//!
//! Every step runs even if an earlier one failed; all failures are reported
//! together as [`BakeError::Failed`].

use crate::{
    assets::{AssetReport, copy_assets},
    config::SiteConfig,
    crawler::{CrawlReport, Crawler},
    document::{BUILTIN_TYPES, DocumentTypeListener, DocumentTypes},
    engine::EngineRegistry,
    log,
    model::ModelExtractors,
    parser::{MarkupEngines, markup_engines},
    render::{RenderError, Renderer, tools},
    store::{ContentStore, MemoryStore, StoreError},
    template::{TemplateEngines, error_chain},
    utils::hash,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error("baking failed with {count} error(s):\n{}", errors.join("\n"))]
    Failed { count: usize, errors: Vec<String> },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one bake produced.
#[derive(Debug, Default)]
pub struct BakeReport {
    pub crawl: CrawlReport,
    /// Documents rendered.
    pub rendered: usize,
    /// Index pages, archive, feed, tag pages, sitemap, 404.
    pub artifacts: usize,
    pub assets: usize,
}

/// Creates a store partition for every new document type.
struct StoreSchema {
    store: Arc<dyn ContentStore>,
}

impl DocumentTypeListener for StoreSchema {
    fn added(&self, _types: &DocumentTypes, doc_type: &str) {
        self.store.evolve_schema(doc_type);
    }
}

/// One engine registration, for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEntry {
    pub kind: &'static str,
    pub key: String,
    pub implementation: String,
}

pub struct Oven {
    config: &'static SiteConfig,
    clean: bool,
    types: Arc<DocumentTypes>,
    store: Arc<MemoryStore>,
    markup: Arc<MarkupEngines>,
    templates: Arc<TemplateEngines>,
    extractors: Arc<ModelExtractors>,
}

impl Oven {
    /// Prepare a bake. `reset` ignores the cached content store.
    pub fn new(config: &'static SiteConfig, reset: bool) -> Self {
        let clean = reset || config.build.clear_cache;
        let store = Arc::new(if clean {
            MemoryStore::new()
        } else {
            MemoryStore::load(&config.build.cache)
        });
        check_templates(config, &store);

        let types = Arc::new(DocumentTypes::new());
        let schema: Arc<dyn ContentStore> = store.clone();
        for doc_type in BUILTIN_TYPES {
            schema.evolve_schema(doc_type);
        }
        types.add_listener(Arc::new(StoreSchema { store: schema }));

        let markup = Arc::new(markup_engines(config));
        let templates = Arc::new(TemplateEngines::new(config));
        let extractors = Arc::new(ModelExtractors::new(Arc::clone(&types), config));
        extractors.listen();

        {
            let markup = Arc::clone(&markup);
            let templates = Arc::clone(&templates);
            let extractors = Arc::clone(&extractors);
            types.before_first_read(move || {
                markup.ensure_loaded();
                templates.registry().ensure_loaded();
                extractors.registry().ensure_loaded();
            });
        }

        for doc_type in config.custom_document_types() {
            types.add_document_type(&doc_type);
        }
        types.add_document_type(&config.content.data_type);

        Self {
            config,
            clean,
            types,
            store,
            markup,
            templates,
            extractors,
        }
    }

    pub fn store(&self) -> Arc<dyn ContentStore> {
        self.store.clone()
    }

    pub fn types(&self) -> &Arc<DocumentTypes> {
        &self.types
    }

    pub fn templates(&self) -> &Arc<TemplateEngines> {
        &self.templates
    }

    pub fn extractors(&self) -> &Arc<ModelExtractors> {
        &self.extractors
    }

    fn crawler(&self) -> Crawler {
        Crawler::new(
            self.config,
            Arc::clone(&self.markup),
            self.store(),
            Arc::clone(&self.types),
        )
    }

    /// Crawl, render and copy assets, then persist the store.
    pub fn bake(&self) -> Result<BakeReport, BakeError> {
        let mut report = BakeReport::default();
        let mut errors = Vec::new();

        log!("bake"; "document types: {}", self.types.document_types().join(", "));

        // Crawl
        let crawler = self.crawler();
        let mut crawl = crawler.crawl();
        crawl.merge(crawler.crawl_data());
        log!(
            "crawl";
            "{} new, {} updated, {} unchanged, {} skipped",
            crawl.new,
            crawl.updated,
            crawl.identical,
            crawl.skipped
        );
        errors.append(&mut crawl.errors);
        report.crawl = crawl;

        // Render
        let renderer = Renderer::new(
            self.config,
            self.store(),
            Arc::clone(&self.extractors),
            Arc::clone(&self.templates),
        )?;
        match renderer.render_documents() {
            Ok(count) => report.rendered = count,
            Err(err) => collect(err, &mut errors),
        }
        log!("render"; "{} document(s)", report.rendered);

        for tool in tools() {
            match tool.render(&renderer) {
                Ok(0) => {}
                Ok(count) => {
                    log!("render"; "{}: {count}", tool.name());
                    report.artifacts += count;
                }
                Err(err) => collect(err, &mut errors),
            }
        }

        // Assets
        let AssetReport {
            copied,
            errors: asset_errors,
            ..
        } = copy_assets(self.config, self.clean);
        report.assets = copied;
        errors.extend(asset_errors.iter().map(|err| error_chain(err)));

        if let Err(err) = self.store.save(&self.config.build.cache) {
            errors.push(error_chain(&err));
        }

        if errors.is_empty() {
            Ok(report)
        } else {
            Err(BakeError::Failed {
                count: errors.len(),
                errors,
            })
        }
    }

    /// Remove stored documents whose source is gone, then persist the store.
    pub fn prune(&self) -> Result<Vec<String>, BakeError> {
        let removed = self.crawler().prune();
        for source in &removed {
            log!("prune"; "{source}");
        }
        self.store.save(&self.config.build.cache)?;
        Ok(removed)
    }

    /// Every registration of the three engine registries.
    pub fn engines(&self) -> Vec<EngineEntry> {
        let mut entries = Vec::new();
        list(&self.markup, &mut entries);
        list(self.templates.registry(), &mut entries);
        list(self.extractors.registry(), &mut entries);
        entries
    }
}

fn list<E: ?Sized + Send + Sync>(registry: &EngineRegistry<E>, entries: &mut Vec<EngineEntry>) {
    for key in registry.keys() {
        let implementation = registry.implementation(&key).unwrap_or_default();
        entries.push(EngineEntry {
            kind: registry.kind(),
            key,
            implementation,
        });
    }
}

fn collect(err: RenderError, errors: &mut Vec<String>) {
    match err {
        RenderError::Aggregate { errors: batch, .. } => errors.extend(batch),
        other => errors.push(error_chain(&other)),
    }
}

/// Drop cached documents when the template folder changed since the
/// snapshot was written.
fn check_templates(config: &SiteConfig, store: &MemoryStore) {
    let signature = match hash::tree_signature(&config.build.templates) {
        Ok(signature) => signature,
        Err(err) => {
            log!("warn"; "cannot hash template folder: {err}");
            store.clear();
            return;
        }
    };

    if let Some(previous) = store.template_signature()
        && previous != signature
    {
        log!("bake"; "templates changed, re-rendering everything");
        store.clear();
    }
    store.set_template_signature(signature);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parser::tests::leak,
        render::tests::TEMPLATES,
        template::tests::{EchoEngine, config_with_templates},
    };
    use std::{fs, path::Path};

    const POST: &str = "title=First\ntype=post\nstatus=published\ndate=2024-01-02\ntags=rust\n~~~~~~\n<p>first</p>";
    const PAGE: &str = "title=About\ntype=page\nstatus=published\ndate=2024-01-01\n~~~~~~\n<p>about</p>";
    const DRAFT: &str = "title=Later\ntype=post\nstatus=draft\ndate=2024-01-03\n~~~~~~\n<p>later</p>";

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site(configure: impl FnOnce(&mut SiteConfig)) -> (tempfile::TempDir, &'static SiteConfig) {
        let (dir, mut config) = config_with_templates(TEMPLATES);
        let root = dir.path();
        write(root, "content/blog/first.html", POST);
        write(root, "content/about.html", PAGE);
        write(root, "content/later.html", DRAFT);
        write(root, "data/authors.json", r#"{"ann": "Ann"}"#);
        write(root, "assets/css/site.css", "body {}");
        config.update_path_with_root(root);
        configure(&mut config);
        (dir, leak(config))
    }

    fn oven(config: &'static SiteConfig, reset: bool) -> Oven {
        let oven = Oven::new(config, reset);
        oven.templates().registry().ensure_loaded();
        oven.templates().register("tera", "TestEngine", Arc::new(EchoEngine));
        oven
    }

    #[test]
    fn test_bake_site() {
        let (_dir, config) = site(|_| {});
        let report = oven(config, false).bake().unwrap();

        assert_eq!(report.crawl.new, 4);
        assert_eq!(report.rendered, 3);
        // index, archive, feed, one tag page
        assert_eq!(report.artifacts, 4);
        assert_eq!(report.assets, 1);

        let output = &config.build.output;
        for file in [
            "blog/first.html",
            "about.html",
            "later-draft.html",
            "index.html",
            "archive.html",
            "feed.xml",
            "tags/rust.html",
            "css/site.css",
        ] {
            assert!(output.join(file).is_file(), "{file}");
        }
        assert!(!output.join("authors.json").exists());

        let post = fs::read_to_string(output.join("blog/first.html")).unwrap();
        assert!(post.starts_with("post.tera:"));
        assert!(post.contains("\"rootpath\":\"../\""));
    }

    #[test]
    fn test_second_bake_is_incremental() {
        let (_dir, config) = site(|_| {});
        oven(config, false).bake().unwrap();

        let report = oven(config, false).bake().unwrap();
        assert_eq!((report.crawl.new, report.crawl.identical), (0, 4));
        assert_eq!(report.rendered, 0);

        let report = oven(config, true).bake().unwrap();
        assert_eq!(report.crawl.new, 4);
        assert_eq!(report.rendered, 3);
    }

    #[test]
    fn test_template_change_rerenders() {
        let (_dir, config) = site(|_| {});
        oven(config, false).bake().unwrap();

        fs::write(config.build.templates.join("post.tera"), "changed").unwrap();
        let report = oven(config, false).bake().unwrap();
        assert_eq!(report.crawl.new, 4);
        assert_eq!(report.rendered, 3);
    }

    #[test]
    fn test_custom_types() {
        let (dir, config) = site(|config| config.content.types = vec!["project".into()]);
        write(dir.path(), "templates/project.tera", "");
        write(
            dir.path(),
            "content/projects/jbake.html",
            "title=JBake\ntype=project\nstatus=published\n~~~~~~\n",
        );

        let oven = oven(config, false);
        assert!(oven.types().contains("project"));
        assert!(oven.types().contains("data"));
        assert!(oven.extractors().contains_key("projects"));
        assert!(oven.extractors().contains_key("published_projects"));

        assert_eq!(oven.bake().unwrap().rendered, 4);
        assert!(config.build.output.join("projects/jbake.html").is_file());
    }

    #[test]
    fn test_failures_are_reported_after_all_steps() {
        let (dir, config) = site(|_| {});
        write(dir.path(), "content/guide.adoc", "= Guide");

        let err = oven(config, false).bake().unwrap_err();
        let BakeError::Failed { count, errors } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(*count, 1);
        assert!(errors[0].contains("AsciidocEngine"));

        // The rest of the site was still produced and the store saved.
        assert!(config.build.output.join("blog/first.html").is_file());
        assert!(config.build.output.join("css/site.css").is_file());
        assert!(config.build.cache.is_dir());
    }

    #[test]
    fn test_prune() {
        let (_dir, config) = site(|_| {});
        oven(config, false).bake().unwrap();
        fs::remove_file(config.build.content.join("about.html")).unwrap();

        let removed = oven(config, false).prune().unwrap();
        assert_eq!(removed, vec!["about.html"]);
        assert!(oven(config, false).store().find_by_source("about.html").is_none());
    }

    #[test]
    fn test_engine_listing() {
        let (_dir, config) = site(|_| {});
        let entries = Oven::new(config, false).engines();
        let find = |key: &str| entries.iter().find(|entry| entry.key == key).cloned();

        let html = find("html").unwrap();
        assert_eq!((html.kind, html.implementation.as_str()), ("markup engine", "RawHtmlEngine"));
        assert_eq!(find("adoc").unwrap().implementation, "AsciidocEngine");
        assert_eq!(find("j2").unwrap().kind, "template engine");
        assert_eq!(find("alltags").unwrap().kind, "model extractor");
    }

    #[test]
    #[cfg(feature = "tera")]
    fn test_bake_with_tera() {
        let (_dir, mut config) = config_with_templates(&[
            ("post.tera", "{{ content.title }} ({{ published_posts | length }})"),
            ("page.tera", "{{ content.title }}"),
            (
                "masterindex.tera",
                "{% for post in published_posts %}<a href=\"{{ content.rootpath }}{{ post.uri }}\">{{ post.title }}</a>{% endfor %}",
            ),
        ]);
        let root = config.get_root().to_path_buf();
        write(&root, "content/blog/first.html", POST);
        write(&root, "content/about.html", PAGE);
        config.render.archive = false;
        config.render.feed = false;
        config.tags.render = false;
        let config = leak(config);

        let report = Oven::new(config, false).bake().unwrap();
        assert_eq!((report.rendered, report.artifacts), (2, 1));

        let output = &config.build.output;
        assert_eq!(fs::read_to_string(output.join("blog/first.html")).unwrap(), "First (1)");
        assert_eq!(
            fs::read_to_string(output.join("index.html")).unwrap(),
            "<a href=\"blog/first.html\">First</a>"
        );
    }
}
