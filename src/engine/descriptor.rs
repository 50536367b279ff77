//! Engine descriptor files.
//!
//! A descriptor maps an implementation identifier to the keys it serves:
//!
//! ```text
//! # comment
//! MarkdownEngine=md,markdown
//! RawHtmlEngine=html
//! ```
//!
//! The built-in descriptor of each registry is compiled into the binary;
//! files with the same name found in the `[build].plugins` folders are
//! appended after it, so later descriptors override earlier keys.

use crate::log;
use std::{fs, io, path::PathBuf};
use thiserror::Error;

/// Problems with descriptor files. They are logged and never fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot read descriptor `{}`: {}", .0.display(), .1)]
    Io(PathBuf, io::Error),

    #[error("{origin}:{line}: expected `identifier=key[,key...]`, got `{text}`")]
    Malformed {
        origin: String,
        line: usize,
        text: String,
    },
}

/// One `identifier=key1,key2` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub implementation: String,
    pub keys: Vec<String>,
}

/// A parsed descriptor and where it came from.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub source: String,
    pub entries: Vec<DescriptorEntry>,
}

impl Descriptor {
    /// Parse properties-style text. Malformed lines are reported and skipped.
    pub fn parse(source: &str, text: &str) -> Self {
        let mut entries = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let malformed = || EngineError::Malformed {
                origin: source.to_owned(),
                line: index + 1,
                text: line.to_owned(),
            };

            let Some((implementation, keys)) = line.split_once('=') else {
                log!("warn"; "{}", malformed());
                continue;
            };

            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from)
                .collect();
            let implementation = implementation.trim();

            if implementation.is_empty() || keys.is_empty() {
                log!("warn"; "{}", malformed());
                continue;
            }

            entries.push(DescriptorEntry {
                implementation: implementation.to_owned(),
                keys,
            });
        }

        Self {
            source: source.to_owned(),
            entries,
        }
    }

    /// Collect the built-in descriptor plus every `<dir>/<name>` that exists.
    pub fn discover(name: &str, builtin: &str, dirs: &[PathBuf]) -> Vec<Self> {
        let mut descriptors = vec![Self::parse(&format!("built-in {name}"), builtin)];

        for dir in dirs {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(text) => descriptors.push(Self::parse(&path.display().to_string(), &text)),
                Err(err) => log!("warn"; "{}", EngineError::Io(path, err)),
            }
        }

        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries() {
        let descriptor = Descriptor::parse(
            "test",
            "# engines\n! legacy comment\n\nMarkdownEngine = md, markdown\nRawHtmlEngine=html\n",
        );

        assert_eq!(
            descriptor.entries,
            vec![
                DescriptorEntry {
                    implementation: "MarkdownEngine".into(),
                    keys: vec!["md".into(), "markdown".into()],
                },
                DescriptorEntry {
                    implementation: "RawHtmlEngine".into(),
                    keys: vec!["html".into()],
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let descriptor = Descriptor::parse("test", "NoEquals\n=md\nEmpty=\nOk=a,,b\n");

        assert_eq!(descriptor.entries.len(), 1);
        assert_eq!(descriptor.entries[0].keys, vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_message() {
        let err = EngineError::Malformed {
            origin: "plugins/markup_engines.properties".into(),
            line: 3,
            text: "NoEquals".into(),
        };
        assert_eq!(
            err.to_string(),
            "plugins/markup_engines.properties:3: expected `identifier=key[,key...]`, got `NoEquals`"
        );
    }

    #[test]
    fn test_unreadable_message() {
        let err = EngineError::Io(
            PathBuf::from("plugins/markup_engines.properties"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "cannot read descriptor `plugins/markup_engines.properties`: denied"
        );
    }

    #[test]
    fn test_discover_appends_plugin_dirs() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("engines.properties"), "Extra=x\n").unwrap();

        let descriptors = Descriptor::discover(
            "engines.properties",
            "Builtin=a",
            &[first.path().to_path_buf(), second.path().to_path_buf()],
        );

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].entries[0].implementation, "Builtin");
        assert_eq!(descriptors[1].entries[0].implementation, "Extra");
    }
}
