//! `[site]` section configuration.
//!
//! Site metadata exposed to every template through `config.site`.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in jbake.toml - basic site metadata.
///
/// # Example
/// ```toml
/// [site]
/// title = "My Blog"
/// description = "Notes on Rust"
/// author = "Alice"
/// url = "https://myblog.com"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteInfo {
    /// Site title displayed in browser tab and headers.
    #[serde(default)]
    pub title: String,

    /// Site description for feeds and meta tags.
    #[serde(default)]
    pub description: String,

    /// Author name for feeds and meta tags.
    #[serde(default = "defaults::site::author")]
    #[educe(Default = defaults::site::author())]
    pub author: String,

    /// Author email for feeds.
    #[serde(default = "defaults::site::email")]
    #[educe(Default = defaults::site::email())]
    pub email: String,

    /// Base URL for absolute links in feed/sitemap.
    #[serde(default = "defaults::site::url")]
    #[educe(Default = defaults::site::url())]
    pub url: Option<String>,

    /// BCP 47 language code (e.g., "en", "de-CH").
    #[serde(default = "defaults::site::language")]
    #[educe(Default = defaults::site::language())]
    pub language: String,
}
