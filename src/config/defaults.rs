//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn url() -> Option<String> {
        None
    }

    pub fn author() -> String {
        "<YOUR_NAME>".into()
    }

    pub fn email() -> String {
        "user@noreply.jbake".into()
    }

    pub fn language() -> String {
        "en".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn templates() -> PathBuf {
        "templates".into()
    }

    pub fn assets() -> PathBuf {
        "assets".into()
    }

    pub fn data() -> PathBuf {
        "data".into()
    }

    pub fn output() -> PathBuf {
        "output".into()
    }

    pub fn cache() -> PathBuf {
        ".jbake-cache".into()
    }

    pub fn output_extension() -> String {
        ".html".into()
    }

    pub fn draft_suffix() -> String {
        "-draft".into()
    }
}

// ============================================================================
// [content] Section Defaults
// ============================================================================

pub mod content {
    pub fn date_format() -> String {
        "%Y-%m-%d".into()
    }

    pub fn header_separator() -> String {
        "~~~~~~".into()
    }

    pub fn data_type() -> String {
        "data".into()
    }
}

// ============================================================================
// [tags] Section Defaults
// ============================================================================

pub mod tags {
    pub fn path() -> String {
        "tags".into()
    }
}

// ============================================================================
// [render] Section Defaults
// ============================================================================

pub mod render {
    pub fn index_file() -> String {
        "index.html".into()
    }

    pub fn posts_per_page() -> usize {
        5
    }

    pub fn archive_file() -> String {
        "archive.html".into()
    }

    pub fn feed_file() -> String {
        "feed.xml".into()
    }

    pub fn feed_count() -> usize {
        10
    }

    pub fn sitemap_file() -> String {
        "sitemap.xml".into()
    }

    pub fn error404_file() -> String {
        "404.html".into()
    }
}

// ============================================================================
// [templates] Section Defaults
// ============================================================================

pub mod templates {
    pub fn extension() -> String {
        "tera".into()
    }
}

// ============================================================================
// [markdown] Section Defaults
// ============================================================================

pub mod markdown {
    pub fn extensions() -> Vec<String> {
        ["tables", "strikethrough", "footnotes", "tasklists"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}
