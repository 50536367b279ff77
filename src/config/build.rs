//! `[build]` section configuration.
//!
//! Folder layout of the project plus output naming and cache settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in jbake.toml - folders and output settings.
///
/// # Example
/// ```toml
/// [build]
/// content = "content"
/// templates = "templates"
/// output = "output"
/// output_extension = ".html"
/// plugins = ["plugins"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Content source folder.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Template folder.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Static assets copied verbatim to the output.
    #[serde(default = "defaults::build::assets")]
    #[educe(Default = defaults::build::assets())]
    pub assets: PathBuf,

    /// Data files (json/yaml/toml) made available to templates.
    #[serde(default = "defaults::build::data")]
    #[educe(Default = defaults::build::data())]
    pub data: PathBuf,

    /// Destination folder.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Folder holding the persisted content store.
    #[serde(default = "defaults::build::cache")]
    #[educe(Default = defaults::build::cache())]
    pub cache: PathBuf,

    /// Extra folders searched for engine descriptor files.
    #[serde(default)]
    pub plugins: Vec<PathBuf>,

    /// Extension of rendered documents (with leading dot).
    #[serde(default = "defaults::build::output_extension")]
    #[educe(Default = defaults::build::output_extension())]
    pub output_extension: String,

    /// Appended to the output name of draft documents.
    #[serde(default = "defaults::build::draft_suffix")]
    #[educe(Default = defaults::build::draft_suffix())]
    pub draft_suffix: String,

    /// Minify HTML/XML output.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub minify: bool,

    /// Discard the persisted content store before baking.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clear_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.content, PathBuf::from("content"));
        assert_eq!(config.build.output, PathBuf::from("output"));
        assert_eq!(config.build.output_extension, ".html");
        assert_eq!(config.build.draft_suffix, "-draft");
        assert!(config.build.plugins.is_empty());
        assert!(!config.build.minify);
        assert!(!config.build.clear_cache);
    }

    #[test]
    fn test_build_config_custom() {
        let config: SiteConfig = toml::from_str(
            r#"
            [build]
            content = "src"
            output = "public"
            output_extension = ".htm"
            plugins = ["plugins", "vendor/plugins"]
            minify = true
        "#,
        )
        .unwrap();

        assert_eq!(config.build.content, PathBuf::from("src"));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.output_extension, ".htm");
        assert_eq!(config.build.plugins.len(), 2);
        assert!(config.build.minify);
    }
}
