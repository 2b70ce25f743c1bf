//! Post metadata, before and after validation.

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

/// Metadata as extracted from a post, nothing checked yet.
///
/// Extractors fill in the defaults: `slug` from the file name, `excerpt` from
/// the first non-empty body line, `tags` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrontmatter {
    pub category: Option<String>,
    pub excerpt: String,
    /// Date as written in the document
    pub published: Option<String>,
    pub slug: String,
    pub subtitle: Option<String>,
    pub tags: Vec<String>,
    pub title: Option<String>,
    /// Name of a layout in the layouts directory
    pub layout: Option<String>,
}

/// Validated post metadata, exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frontmatter {
    pub category: String,
    pub excerpt: String,
    pub published: NaiveDate,
    pub slug: String,
    pub subtitle: String,
    pub tags: Vec<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

/// Parse a publication date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD` and RFC 3339 timestamps (the date part
/// of the timestamp is kept).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("2024/01/15"), expected);
        assert_eq!(parse_date(" 2024-01-15 "), expected);
        assert_eq!(parse_date("2024-01-15T10:30:00Z"), expected);
        assert_eq!(parse_date("2024-01-15T23:30:00+02:00"), expected);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("15.01.2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_frontmatter_serializes_date_as_iso() {
        let frontmatter = Frontmatter {
            category: "story".into(),
            excerpt: String::new(),
            published: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            slug: "hello".into(),
            subtitle: String::new(),
            tags: vec![],
            title: "Hello".into(),
            layout: None,
        };
        let value = serde_json::to_value(&frontmatter).unwrap();

        assert_eq!(value["published"], "2024-01-15");
        assert!(value.get("layout").is_none());
    }
}
