//! Site configuration management for `jbake.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[site]`      | Site metadata (title, author, url)               |
//! | `[build]`     | Folders, output extension, cache, plugin dirs    |
//! | `[content]`   | Header parsing, defaults, custom types           |
//! | `[tags]`      | Tag sanitization and tag pages                   |
//! | `[render]`    | Index, archive, feed, sitemap, 404               |
//! | `[templates]` | Template file per document type                  |
//! | `[markdown]`  | Markdown extensions                              |
//! | `[extra]`     | User-defined custom fields                       |
//!
//! # Example
//!
//! ```toml
//! [site]
//! title = "My Blog"
//! url = "https://example.com"
//!
//! [build]
//! output = "public"
//!
//! [render]
//! paginate = true
//!
//! [extra]
//! analytics_id = "UA-12345"
//! ```

mod build;
pub mod defaults;
mod error;
mod pipeline;
mod site;

pub use build::BuildConfig;
pub use error::{ConfigError, check_date_format};
pub use pipeline::{
    ARTIFACT_TEMPLATES, ContentConfig, MarkdownConfig, RenderConfig, TagsConfig, TemplatesConfig,
};
pub use site::SiteInfo;

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing jbake.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub site: SiteInfo,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub tags: TagsConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Every custom type named by `[content].types` or `[templates.files]`.
    pub fn custom_document_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .content
            .types
            .iter()
            .cloned()
            .chain(self.templates.document_types().map(String::from))
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        self.update_path_with_root(&root);
        self.config_path = Self::normalize_path(&self.get_root().join(&cli.config));
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    pub fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        let build = &mut self.build;
        build.content = Self::normalize_path(&root.join(&build.content));
        build.templates = Self::normalize_path(&root.join(&build.templates));
        build.assets = Self::normalize_path(&root.join(&build.assets));
        build.data = Self::normalize_path(&root.join(&build.data));
        build.output = Self::normalize_path(&root.join(&build.output));
        build.cache = Self::normalize_path(&root.join(&build.cache));
        build.plugins = build
            .plugins
            .iter()
            .map(|dir| Self::normalize_path(&root.join(dir)))
            .collect();
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before baking
    pub fn validate(&self) -> Result<()> {
        if !self.build.content.is_dir() {
            bail!(ConfigError::Validation(format!(
                "content folder `{}` not found",
                self.build.content.display()
            )));
        }

        if !self.build.output_extension.starts_with('.') {
            bail!(ConfigError::Validation(
                "[build.output_extension] must start with a dot".into()
            ));
        }

        if self.render.paginate && self.render.posts_per_page == 0 {
            bail!(ConfigError::Validation(
                "[render.posts_per_page] must be > 0 when pagination is enabled".into()
            ));
        }

        if self.templates.extension.is_empty() {
            bail!(ConfigError::Validation(
                "[templates.extension] must not be empty".into()
            ));
        }

        if let Some(url) = &self.site.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[site.url] must start with http:// or https://".into()
            ));
        }

        check_date_format(&self.content.date_format)?;

        if let Some(status) = &self.content.default_status
            && crate::document::Status::parse(status).is_none()
        {
            bail!(ConfigError::Validation(format!(
                "[content.default_status] `{status}` is neither draft nor published"
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str(
            r#"
            [site]
            title = "My Blog"
            author = "Test Author"
        "#,
        )
        .unwrap();

        assert_eq!(config.site.title, "My Blog");
        assert_eq!(config.site.author, "Test Author");
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SiteConfig::from_str("[site\ntitle = 1").is_err());
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        assert!(SiteConfig::from_str("[server]\nport = 1").is_err());
    }

    #[test]
    fn test_get_root_default() {
        let config = SiteConfig::default();
        assert_eq!(config.get_root(), Path::new("./"));
    }

    #[test]
    fn test_update_path_with_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.build.plugins = vec!["plugins".into()];
        config.update_path_with_root(dir.path());

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.build.content, root.join("content"));
        assert_eq!(config.build.output, root.join("output"));
        assert_eq!(config.build.plugins, vec![root.join("plugins")]);
    }

    #[test]
    fn test_custom_document_types() {
        let config = SiteConfig::from_str(
            r#"
            [content]
            types = ["project", "note"]
            [templates.files]
            project = "project.tera"
            recipe = "recipe.tera"
            tag = "tag.tera"
        "#,
        )
        .unwrap();

        assert_eq!(
            config.custom_document_types(),
            vec!["note", "project", "recipe"]
        );
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let mut config = SiteConfig::default();
        config.update_path_with_root(dir.path());
        assert!(config.validate().is_ok());

        config.build.output_extension = "html".into();
        assert!(config.validate().is_err());
        config.build.output_extension = ".html".into();

        config.content.default_status = Some("archived".into());
        assert!(config.validate().is_err());
        config.content.default_status = None;

        config.content.date_format = "%d/%m/%Q".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::DateFormat(_))
        ));
    }

    #[test]
    fn test_validate_missing_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.update_path_with_root(dir.path());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("content folder"));
    }

    #[test]
    fn test_extra_fields() {
        let config = SiteConfig::from_str(
            r#"
            [extra]
            analytics_id = "UA-12345"
            show_comments = true
        "#,
        )
        .unwrap();

        assert_eq!(
            config.extra.get("analytics_id").and_then(|v| v.as_str()),
            Some("UA-12345")
        );
        assert_eq!(
            config.extra.get("show_comments").and_then(|v| v.as_bool()),
            Some(true)
        );
    }
}
