//! Tera templates.
//!
//! Tera needs a complete context up front, so laziness is approximated: the
//! template folder is scanned once for identifiers and only extractor keys
//! that occur somewhere in it are computed for each render.

use super::{TemplateEngine, TemplateError, error_chain};
use crate::model::{JsonAdapter, LazyModel};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{LazyLock, OnceLock},
};
use walkdir::WalkDir;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier pattern"));

struct Loaded {
    tera: tera::Tera,
    identifiers: FxHashSet<String>,
}

pub struct TeraEngine {
    templates_dir: PathBuf,
    loaded: OnceLock<Result<Loaded, String>>,
}

impl TeraEngine {
    pub fn new(templates_dir: &Path) -> Self {
        Self {
            templates_dir: templates_dir.to_path_buf(),
            loaded: OnceLock::new(),
        }
    }

    fn loaded(&self) -> Result<&Loaded, TemplateError> {
        self.loaded
            .get_or_init(|| load(&self.templates_dir))
            .as_ref()
            .map_err(|err| TemplateError::Render(err.clone()))
    }
}

fn load(dir: &Path) -> Result<Loaded, String> {
    let glob = format!("{}/**/*.tera", dir.display());
    let tera = tera::Tera::new(&glob).map_err(|err| error_chain(&err))?;

    let identifiers = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| fs::read_to_string(entry.path()).ok())
        .flat_map(|source| {
            IDENTIFIER
                .find_iter(&source)
                .map(|m| m.as_str().to_owned())
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(Loaded { tera, identifiers })
}

impl TemplateEngine for TeraEngine {
    fn render_document(
        &self,
        model: &LazyModel,
        template: &str,
        writer: &mut dyn Write,
    ) -> Result<(), TemplateError> {
        let loaded = self.loaded()?;

        let mut context = tera::Context::new();
        for key in model.keys() {
            if !model.entries().contains(&key) && !loaded.identifiers.contains(&key) {
                continue;
            }
            if let Some(value) = model.get(&key, &JsonAdapter) {
                context.insert(key, &value);
            }
        }

        loaded
            .tera
            .render_to(template, &context, writer)
            .map_err(|err| TemplateError::Render(error_chain(&err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::Status,
        model::{TemplateModel, tests::doc},
        parser::tests::leak,
        template::tests::{config_with_templates, lazy},
    };
    use serde_json::json;

    fn render(files: &[(&str, &str)], template: &str, model: TemplateModel) -> Result<String, TemplateError> {
        let (_dir, config) = config_with_templates(files);
        let config = leak(config);
        let engine = TeraEngine::new(&config.build.templates);
        let model = lazy(config, model);
        model
            .store()
            .add_document(doc("post", "first", Status::Published, 1, &["rust"]))
            .unwrap();

        let mut out = Vec::new();
        engine.render_document(&model, template, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_render_content_and_extractors() {
        let mut model = TemplateModel::new();
        model.set("content", json!({"title": "Home"}));

        let out = render(
            &[(
                "index.tera",
                "{{ content.title }}|{% for post in published_posts %}{{ post.title }}{% endfor %}|{{ alltags | join(sep=\",\") }}",
            )],
            "index.tera",
            model,
        )
        .unwrap();
        assert_eq!(out, "Home|first|rust");
    }

    #[test]
    fn test_includes_see_extractors() {
        let out = render(
            &[
                ("page.tera", "{% include \"partials/list.tera\" %}"),
                ("partials/list.tera", "{{ posts | length }}"),
            ],
            "page.tera",
            TemplateModel::new(),
        )
        .unwrap();
        assert_eq!(out, "1");
    }

    #[test]
    fn test_render_error_message() {
        let err = render(&[("bad.tera", "{{ missing.field }}")], "bad.tera", TemplateModel::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
        assert!(err.to_string().contains("bad.tera"));
    }

    #[test]
    fn test_syntax_error_is_reported_on_render() {
        let err = render(&[("broken.tera", "{% if %}")], "broken.tera", TemplateModel::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }
}
