//! Output minification.
//!
//! Rendered files are minified by output extension when `[build].minify` is
//! set: `.html`/`.htm` through `minify-html`, `.xml` (feeds, sitemaps) by
//! collapsing indentation. Anything else is written as rendered.

use crate::config::SiteConfig;
use std::{borrow::Cow, path::Path};

/// Kind of minification an output file gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Html,
    Xml,
    Other,
}

impl OutputKind {
    pub fn of(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html" | "htm") => Self::Html,
            Some("xml" | "rss" | "atom") => Self::Xml,
            _ => Self::Other,
        }
    }
}

/// Minify rendered `content` destined for `path`.
///
/// Returns the input untouched when minification is disabled or the output
/// kind has no minifier.
pub fn minify<'a>(path: &Path, content: &'a [u8], config: &SiteConfig) -> Cow<'a, [u8]> {
    if !config.build.minify {
        return Cow::Borrowed(content);
    }

    match OutputKind::of(path) {
        OutputKind::Html => Cow::Owned(minify_html(content)),
        OutputKind::Xml => match std::str::from_utf8(content) {
            Ok(xml) => Cow::Owned(minify_xml(xml).into_bytes()),
            Err(_) => Cow::Borrowed(content),
        },
        OutputKind::Other => Cow::Borrowed(content),
    }
}

fn minify_html(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.minify_css = true;
    cfg.minify_js = true;
    minify_html::minify(html, &cfg)
}

/// Drop indentation and blank lines. Lines that meet in the middle of text
/// keep one space between them.
fn minify_xml(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    for line in xml.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !out.is_empty() && !out.ends_with('>') && !line.starts_with('<') {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.build.minify = enabled;
        config
    }

    #[test]
    fn test_output_kind() {
        assert_eq!(OutputKind::of(Path::new("blog/post.html")), OutputKind::Html);
        assert_eq!(OutputKind::of(Path::new("feed.XML")), OutputKind::Xml);
        assert_eq!(OutputKind::of(Path::new("robots.txt")), OutputKind::Other);
    }

    #[test]
    fn test_disabled_is_borrowed() {
        let html = b"<p>\n  Hello\n</p>";
        let result = minify(Path::new("a.html"), html, &config(false));
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_html() {
        let html = b"<html>\n  <body>\n    <p>Hello World</p>\n  </body>\n</html>";
        let result = minify(Path::new("a.html"), html, &config(true));
        let result = String::from_utf8_lossy(&result);

        assert!(!result.contains("\n  "));
        assert!(result.contains("<p>Hello World</p>"));
    }

    #[test]
    fn test_xml_sitemap() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<urlset>

  <url>
    <loc>https://example.com/</loc>
  </url>
</urlset>"#;
        let result = minify(Path::new("sitemap.xml"), xml, &config(true));
        assert_eq!(
            &*result,
            br#"<?xml version="1.0" encoding="UTF-8"?><urlset><url><loc>https://example.com/</loc></url></urlset>"#
        );
    }

    #[test]
    fn test_xml_text_lines_keep_a_space() {
        assert_eq!(
            minify_xml("<description>\n  first line\n  second line\n</description>"),
            "<description>first line second line</description>"
        );
    }

    #[test]
    fn test_other_outputs_untouched() {
        let text = b"  keep\n  me  ";
        let result = minify(Path::new("robots.txt"), text, &config(true));
        assert_eq!(&*result, text);
    }
}
