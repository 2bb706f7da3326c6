//! Raw provider article -> `NewsArticleDraft`, matching the original
//! ingestion pipeline's field mapping and lenient date parsing.

use chrono::{DateTime, Utc};
use mst_schemas::NewsArticleDraft;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub source: Option<RawSource>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSource {
    pub name: Option<String>,
}

/// Parses ISO-8601 with a trailing `Z`, falling back to "now" with a
/// warning (rather than dropping the article) when the timestamp is
/// unparseable, matching the original fetcher's leniency.
fn parse_published_date(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw else { return Utc::now() };
    let normalized = if raw.ends_with('Z') {
        format!("{}+00:00", &raw[..raw.len() - 1])
    } else {
        raw.to_string()
    };

    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|err| {
            tracing::warn!(raw, error = %err, "failed to parse article published date, using now()");
            Utc::now()
        })
}

/// Combines description and content bodies when both are present,
/// matching the original's `description + "\n\n" + content` join.
fn combine_body(description: &Option<String>, content: &Option<String>) -> String {
    match (description.as_deref(), content.as_deref()) {
        (Some(d), Some(c)) => format!("{d}\n\n{c}"),
        (Some(d), None) => d.to_string(),
        (None, Some(c)) => c.to_string(),
        (None, None) => String::new(),
    }
}

/// Returns `None` when the article has neither a title nor any content —
/// such rows are dropped rather than stored with empty data.
pub fn to_draft(raw: RawArticle, asset_type: &str) -> Option<NewsArticleDraft> {
    let content = combine_body(&raw.description, &raw.content);
    if raw.title.is_none() && content.is_empty() {
        return None;
    }

    Some(NewsArticleDraft {
        title: raw.title.unwrap_or_default(),
        content,
        description: raw.description,
        author: raw.author,
        published_date: parse_published_date(raw.published_at.as_deref()),
        source: raw.source.and_then(|s| s.name).unwrap_or_else(|| "Unknown".to_string()),
        url: raw.url,
        asset_type: asset_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_article_missing_title_and_content() {
        let raw = RawArticle {
            title: None,
            description: None,
            content: None,
            author: None,
            published_at: None,
            source: None,
            url: None,
        };
        assert!(to_draft(raw, "stock").is_none());
    }

    #[test]
    fn parses_trailing_z_timestamp() {
        let dt = parse_published_date(Some("2024-03-01T12:00:00Z"));
        assert_eq!(dt.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn falls_back_to_now_on_unparseable_date() {
        let before = Utc::now();
        let dt = parse_published_date(Some("not-a-date"));
        assert!(dt >= before);
    }

    #[test]
    fn combines_description_and_content_with_blank_line() {
        let body = combine_body(&Some("desc".to_string()), &Some("body".to_string()));
        assert_eq!(body, "desc\n\nbody");
    }

    #[test]
    fn missing_source_defaults_to_unknown() {
        let raw = RawArticle {
            title: Some("headline".to_string()),
            description: None,
            content: None,
            author: None,
            published_at: None,
            source: None,
            url: None,
        };
        let draft = to_draft(raw, "stock").unwrap();
        assert_eq!(draft.source, "Unknown");
    }
}
