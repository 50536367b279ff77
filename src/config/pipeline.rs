//! Pipeline sections: `[content]`, `[tags]`, `[render]`, `[templates]`, `[markdown]`.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Template keys that name rendered artifacts rather than document types.
pub const ARTIFACT_TEMPLATES: &[&str] = &["sitemap", "tag", "tagsindex", "error404"];

// ============================================================================
// [content]
// ============================================================================

/// `[content]` section - how source files become documents.
///
/// # Example
/// ```toml
/// [content]
/// date_format = "%Y-%m-%d"
/// default_status = "published"
/// types = ["project"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// chrono pattern for the `date` header.
    #[serde(default = "defaults::content::date_format")]
    #[educe(Default = defaults::content::date_format())]
    pub date_format: String,

    /// Status used when a header omits one.
    pub default_status: Option<String>,

    /// Type used when a header omits one.
    pub default_type: Option<String>,

    /// Line terminating the `key=value` header.
    #[serde(default = "defaults::content::header_separator")]
    #[educe(Default = defaults::content::header_separator())]
    pub header_separator: String,

    /// Document type assigned to data files.
    #[serde(default = "defaults::content::data_type")]
    #[educe(Default = defaults::content::data_type())]
    pub data_type: String,

    /// Render `a/b.md` as `a/b/index.html`.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub uri_no_extension: bool,

    /// Only sources under this prefix get extension-less uris.
    pub uri_no_extension_prefix: Option<String>,

    /// Custom document types on top of the built-ins.
    pub types: Vec<String>,
}

// ============================================================================
// [tags]
// ============================================================================

/// `[tags]` section - tag normalization and tag pages.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct TagsConfig {
    /// Replace spaces inside tags with hyphens.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub sanitize: bool,

    /// Output folder of tag pages.
    #[serde(default = "defaults::tags::path")]
    #[educe(Default = defaults::tags::path())]
    pub path: String,

    /// Render one page per tag.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub render: bool,

    /// Render `<path>/index<ext>` listing all tags.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub index: bool,
}

// ============================================================================
// [render]
// ============================================================================

/// `[render]` section - which site-wide artifacts are produced.
///
/// # Example
/// ```toml
/// [render]
/// paginate = true
/// posts_per_page = 10
/// sitemap = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub index: bool,

    #[serde(default = "defaults::render::index_file")]
    #[educe(Default = defaults::render::index_file())]
    pub index_file: String,

    /// Split the index into pages of `posts_per_page`.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub paginate: bool,

    #[serde(default = "defaults::render::posts_per_page")]
    #[educe(Default = defaults::render::posts_per_page())]
    pub posts_per_page: usize,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub archive: bool,

    #[serde(default = "defaults::render::archive_file")]
    #[educe(Default = defaults::render::archive_file())]
    pub archive_file: String,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub feed: bool,

    #[serde(default = "defaults::render::feed_file")]
    #[educe(Default = defaults::render::feed_file())]
    pub feed_file: String,

    /// Maximum number of posts in the feed.
    #[serde(default = "defaults::render::feed_count")]
    #[educe(Default = defaults::render::feed_count())]
    pub feed_count: usize,

    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub sitemap: bool,

    #[serde(default = "defaults::render::sitemap_file")]
    #[educe(Default = defaults::render::sitemap_file())]
    pub sitemap_file: String,

    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub error404: bool,

    #[serde(default = "defaults::render::error404_file")]
    #[educe(Default = defaults::render::error404_file())]
    pub error404_file: String,
}

// ============================================================================
// [templates]
// ============================================================================

/// `[templates]` section - template file per document type.
///
/// Types without an entry use `<type>.<extension>`.
///
/// # Example
/// ```toml
/// [templates]
/// extension = "jinja"
///
/// [templates.files]
/// post = "blog/post.jinja"
/// project = "project.jinja"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Extension of the preferred template engine.
    #[serde(default = "defaults::templates::extension")]
    #[educe(Default = defaults::templates::extension())]
    pub extension: String,

    /// Explicit template file per type, relative to the template folder.
    pub files: BTreeMap<String, String>,
}

impl TemplatesConfig {
    /// Template file name configured (or derived) for a type.
    pub fn file_for(&self, doc_type: &str) -> String {
        self.files
            .get(doc_type)
            .cloned()
            .unwrap_or_else(|| format!("{doc_type}.{}", self.extension))
    }

    /// Document types declared through template entries.
    pub fn document_types(&self) -> impl Iterator<Item = &str> {
        self.files
            .keys()
            .map(String::as_str)
            .filter(|key| !ARTIFACT_TEMPLATES.contains(key))
    }
}

// ============================================================================
// [markdown]
// ============================================================================

/// `[markdown]` section - enabled Markdown extensions.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Any of `tables`, `strikethrough`, `footnotes`, `tasklists`,
    /// `smart_punctuation`, `heading_attributes`.
    #[serde(default = "defaults::markdown::extensions")]
    #[educe(Default = defaults::markdown::extensions())]
    pub extensions: Vec<String>,
}
