//! Errors raised while loading and validating `jbake.toml`.

use chrono::format::{Item, StrftimeItems};
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config `{}`", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("cannot parse config")]
    Toml(#[from] toml::de::Error),

    /// `[content.date_format]` that chrono cannot use for header dates.
    #[error("[content.date_format] `{0}` is not a usable date pattern")]
    DateFormat(String),

    #[error("invalid config: {0}")]
    Validation(String),
}

/// Reject empty patterns and unknown `%` specifiers.
pub fn check_date_format(pattern: &str) -> Result<(), ConfigError> {
    let invalid = pattern.trim().is_empty()
        || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error));
    if invalid {
        return Err(ConfigError::DateFormat(pattern.to_owned()));
    }
    Ok(())
}
