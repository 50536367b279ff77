//! Date parsing for document headers.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::{fs, path::Path};

/// Parse a header date.
///
/// Tries the configured chrono pattern as a datetime, then as a plain date
/// (midnight), then RFC 3339 and finally ISO `YYYY-MM-DD`.
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|date| date.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Last modification time of a file in local time.
pub fn modified(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// Current local time.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_configured_date() {
        let date = parse_date("2024-02-29", "%Y-%m-%d").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 2, 29));
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_parse_custom_pattern() {
        let date = parse_date("29/02/2024 13:45", "%d/%m/%Y %H:%M").unwrap();
        assert_eq!((date.day(), date.hour(), date.minute()), (29, 13, 45));

        let date = parse_date("01.03.2024", "%d.%m.%Y").unwrap();
        assert_eq!(date.month(), 3);
    }

    #[test]
    fn test_parse_fallbacks() {
        let date = parse_date("2024-05-01T10:00:00+00:00", "%d/%m/%Y").unwrap();
        assert_eq!(date.hour(), 10);

        let date = parse_date("2024-05-01", "%d/%m/%Y").unwrap();
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_date("yesterday", "%Y-%m-%d").is_none());
        assert!(parse_date("2024-02-30", "%Y-%m-%d").is_none());
    }

    #[test]
    fn test_modified_of_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(modified(file.path()).is_some());
        assert!(modified(Path::new("/definitely/not/here")).is_none());
    }
}
