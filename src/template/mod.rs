//! Template engines.
//!
//! | Extension              | Engine        | Feature |
//! |------------------------|---------------|---------|
//! | `tera`                 | Tera          | `tera`  |
//! | `jinja`, `j2`, `jinja2`| MiniJinja     | `jinja` |
//!
//! The template for a document type comes from `[templates.files]`, or
//! `<type>.<templates.extension>` by default. When that file does not exist
//! the same stem is tried with every registered extension, so a site can
//! mix engines.

#[cfg(feature = "jinja")]
mod jinja_engine;
#[cfg(feature = "tera")]
mod tera_engine;

use crate::{
    config::SiteConfig,
    engine::{Catalog, EngineRegistry, MissingPolicy},
    model::LazyModel,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Built-in template engine descriptor.
const TEMPLATE_ENGINES: &str = include_str!("template_engines.properties");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no template for `{key}` (looked for `{file}` in {dir})")]
    NotFound { key: String, file: String, dir: PathBuf },

    #[error("no template engine registered for `{0}`")]
    NoEngine(String),

    #[error("engine {engine} for {file} could not be loaded: {reason}")]
    EngineUnavailable {
        engine: String,
        file: String,
        reason: String,
    },

    /// Failure reported by the template runtime, message only.
    #[error("{0}")]
    Render(String),
}

/// Renders one template with a lazily resolved model.
pub trait TemplateEngine: Send + Sync {
    /// Render `template` (relative to the template folder) into `writer`.
    fn render_document(
        &self,
        model: &LazyModel,
        template: &str,
        writer: &mut dyn Write,
    ) -> Result<(), TemplateError>;
}

/// Flatten an error and its sources into one line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ============================================================================
// Unavailable engine
// ============================================================================

struct UnavailableEngine {
    identifier: String,
    reason: String,
}

impl TemplateEngine for UnavailableEngine {
    fn render_document(
        &self,
        _model: &LazyModel,
        template: &str,
        _writer: &mut dyn Write,
    ) -> Result<(), TemplateError> {
        Err(TemplateError::EngineUnavailable {
            engine: self.identifier.clone(),
            file: template.to_owned(),
            reason: self.reason.clone(),
        })
    }
}

fn unavailable(identifier: &str, reason: &str) -> Arc<dyn TemplateEngine> {
    Arc::new(UnavailableEngine {
        identifier: identifier.to_owned(),
        reason: reason.to_owned(),
    })
}

// ============================================================================
// Registry
// ============================================================================

#[cfg(feature = "tera")]
fn tera_engine(config: &SiteConfig) -> Result<Arc<dyn TemplateEngine>, String> {
    Ok(Arc::new(tera_engine::TeraEngine::new(&config.build.templates)))
}

#[cfg(not(feature = "tera"))]
fn tera_engine(_config: &SiteConfig) -> Result<Arc<dyn TemplateEngine>, String> {
    Err("built without the `tera` feature".into())
}

#[cfg(feature = "jinja")]
fn jinja_engine(config: &SiteConfig) -> Result<Arc<dyn TemplateEngine>, String> {
    Ok(Arc::new(jinja_engine::JinjaEngine::new(&config.build.templates)))
}

#[cfg(not(feature = "jinja"))]
fn jinja_engine(_config: &SiteConfig) -> Result<Arc<dyn TemplateEngine>, String> {
    Err("built without the `jinja` feature (minijinja)".into())
}

/// Template engines keyed by template extension, plus template lookup.
pub struct TemplateEngines {
    config: &'static SiteConfig,
    registry: EngineRegistry<dyn TemplateEngine>,
}

impl TemplateEngines {
    pub fn new(config: &'static SiteConfig) -> Self {
        let catalog = Catalog::new()
            .with("TeraTemplateEngine", move || tera_engine(config))
            .with("JinjaTemplateEngine", move || jinja_engine(config));

        let registry = EngineRegistry::new(
            "template engine",
            "template_engines.properties",
            TEMPLATE_ENGINES,
            catalog,
            MissingPolicy::Sentinel(unavailable),
        )
        .with_search_dirs(config.build.plugins.clone());

        Self { config, registry }
    }

    /// Template file (relative to the template folder) for `key`.
    ///
    /// `key` is a document type or an artifact such as `sitemap`.
    pub fn resolve(&self, key: &str) -> Result<String, TemplateError> {
        let dir = &self.config.build.templates;
        let file = self.config.templates.file_for(key);
        if dir.join(&file).is_file() {
            return Ok(file);
        }

        let stem = Path::new(&file).with_extension("");
        let stem = stem.to_string_lossy();
        self.registry
            .keys()
            .into_iter()
            .map(|extension| format!("{stem}.{extension}"))
            .find(|candidate| dir.join(candidate).is_file())
            .ok_or_else(|| TemplateError::NotFound {
                key: key.to_owned(),
                file,
                dir: dir.clone(),
            })
    }

    /// Render the template for `key` into `writer`.
    pub fn render(&self, key: &str, model: &LazyModel, writer: &mut dyn Write) -> Result<(), TemplateError> {
        let template = self.resolve(key)?;
        let extension = Path::new(&template)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let engine = self
            .registry
            .get(extension)
            .ok_or_else(|| TemplateError::NoEngine(extension.to_owned()))?;

        engine.render_document(model, &template, writer)
    }

    pub fn register(&self, extension: &str, implementation: &str, engine: Arc<dyn TemplateEngine>) {
        self.registry.register(extension, implementation, engine);
    }

    pub fn registry(&self) -> &EngineRegistry<dyn TemplateEngine> {
        &self.registry
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        document::DocumentTypes,
        model::{ModelExtractors, TemplateModel, tests::store},
        parser::tests::leak,
    };
    use std::fs;

    /// Writes `name=<content>` for every explicit model entry.
    pub(crate) struct EchoEngine;

    impl TemplateEngine for EchoEngine {
        fn render_document(
            &self,
            model: &LazyModel,
            template: &str,
            writer: &mut dyn Write,
        ) -> Result<(), TemplateError> {
            let content = model
                .entries()
                .get("content")
                .cloned()
                .unwrap_or_default();
            write!(writer, "{template}:{content}").map_err(|err| TemplateError::Render(err.to_string()))
        }
    }

    pub(crate) fn config_with_templates(files: &[(&str, &str)]) -> (tempfile::TempDir, SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        fs::create_dir_all(&templates).unwrap();
        for (name, content) in files {
            let path = templates.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let mut config = SiteConfig::default();
        config.update_path_with_root(dir.path());
        (dir, config)
    }

    pub(crate) fn lazy(config: &'static SiteConfig, model: TemplateModel) -> LazyModel {
        let extractors = Arc::new(ModelExtractors::new(Arc::new(DocumentTypes::new()), config));
        LazyModel::new(model, extractors, store(), config)
    }

    #[test]
    fn test_resolve_configured_and_default() {
        let (_dir, mut config) = config_with_templates(&[("post.tera", ""), ("blog/page.tera", "")]);
        config.templates.files.insert("page".into(), "blog/page.tera".into());
        let engines = TemplateEngines::new(leak(config));

        assert_eq!(engines.resolve("post").unwrap(), "post.tera");
        assert_eq!(engines.resolve("page").unwrap(), "blog/page.tera");
    }

    #[test]
    fn test_resolve_falls_back_to_other_extensions() {
        let (_dir, config) = config_with_templates(&[("post.jinja", "")]);
        let engines = TemplateEngines::new(leak(config));

        assert_eq!(engines.resolve("post").unwrap(), "post.jinja");
        let err = engines.resolve("feed").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
        assert!(err.to_string().contains("feed.tera"));
    }

    #[test]
    fn test_render_dispatches_by_extension() {
        let (_dir, config) = config_with_templates(&[("post.echo", "")]);
        let config = leak(config);
        let engines = TemplateEngines::new(config);
        engines.register("echo", "EchoEngine", Arc::new(EchoEngine));

        let mut model = TemplateModel::new();
        model.set("content", serde_json::json!("hi"));
        let mut out = Vec::new();
        engines.render("post", &lazy(config, model), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "post.echo:\"hi\"");
    }

    #[test]
    fn test_unavailable_engine_fails_on_use() {
        let (dir, mut config) = config_with_templates(&[("post.ftl", "")]);
        let plugins = dir.path().join("plugins");
        fs::create_dir_all(&plugins).unwrap();
        fs::write(plugins.join("template_engines.properties"), "FreemarkerTemplateEngine=ftl\n").unwrap();
        config.build.plugins = vec![plugins];
        let config = leak(config);

        let engines = TemplateEngines::new(config);
        let mut out = Vec::new();
        let err = engines
            .render("post", &lazy(config, TemplateModel::new()), &mut out)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "engine FreemarkerTemplateEngine for post.ftl could not be loaded: \
             no implementation named `FreemarkerTemplateEngine` in this build"
        );
    }

    #[test]
    fn test_error_chain() {
        let inner = std::io::Error::other("disk full");
        let outer = crate::store::StoreError::Io(PathBuf::from("cache"), inner);
        assert_eq!(error_chain(&outer), "cannot write content store `cache`: disk full");
    }
}
