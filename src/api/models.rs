//! Wire types shared with the hot-article service.
//!
//! The server owns articles, sources and tags; the client only reads them
//! (and writes sources through [`SourceDraft`] / [`SourcePatch`]).  Field
//! names follow the JSON the service produces, renamed where the Rust name
//! reads better.
//!
//! ## Timestamps
//!
//! The service emits timestamps either as RFC 3339 or as naive ISO-8601
//! without an offset.  Naive values are taken to be UTC and anything that
//! fails to parse becomes `None` rather than failing the whole response.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A collected article.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_id: Option<i64>,
    /// Present when the service joins the source in; otherwise resolve it
    /// from the source list by `source_id`.
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Associated tags, in server order.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A configured origin for articles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    /// Open-ended classifier; `manual`, `rss` and `api` are the known values.
    #[serde(default, rename = "type_or_kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub url_or_config: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The source kinds the collector knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Api,
}

impl FeedKind {
    /// Case-insensitive match against the source's kind field.
    pub fn parse(kind: &str) -> Option<Self> {
        if kind.eq_ignore_ascii_case("rss") {
            Some(Self::Rss)
        } else if kind.eq_ignore_ascii_case("api") {
            Some(Self::Api)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::Api => "api",
        }
    }
}

impl Source {
    pub fn feed_kind(&self) -> Option<FeedKind> {
        self.kind.as_deref().and_then(FeedKind::parse)
    }

    /// The trimmed URL, if one is configured.
    pub fn feed_url(&self) -> Option<&str> {
        self.url_or_config
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Whether a per-source collection can be offered for this source.
    pub fn is_collectable(&self) -> bool {
        self.feed_kind().is_some() && self.feed_url().is_some()
    }
}

/// A tag (keyword) attached to articles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDraft {
    pub name: String,
    pub type_or_kind: Option<String>,
    pub url_or_config: Option<String>,
}

/// Body of `PATCH /sources/{id}`.
///
/// Absent fields are left alone by the server.  For the optional fields,
/// `Some(None)` serializes as `null` and clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourcePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_or_kind: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_or_config: Option<Option<String>>,
}

impl SourcePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.type_or_kind.is_none() && self.url_or_config.is_none()
    }
}

/// `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Health {
    pub status: String,
    pub service: String,
}

/// Outcome of a collection over all sources.  Missing fields read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectRunResult {
    pub sources_ok: u32,
    pub sources_fail: u32,
    pub articles_added: u32,
    pub errors: Vec<String>,
}

/// Outcome of a collection for a single source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceCollectResult {
    pub ok: bool,
    pub articles_added: Option<u32>,
    pub error: Option<String>,
}

/// `GET /collect/status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectStatus {
    pub last_run: Option<CollectRunResult>,
    pub message: Option<String>,
}

/// Query string of `GET /articles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub source_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: u32,
    pub offset: u32,
}

impl ArticleQuery {
    /// Query pairs in wire order.  Unset filters are omitted; `limit` and
    /// `offset` are always present.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(id) = self.source_id {
            pairs.push(("source_id", id.to_string()));
        }
        if let Some(id) = self.tag_id {
            pairs.push(("tag_id", id.to_string()));
        }
        if let Some(date) = self.date_from {
            pairs.push(("date_from", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.date_to {
            pairs.push(("date_to", date.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}

/// Parse a service timestamp (RFC 3339, or naive and assumed UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(kind: Option<&str>, url: Option<&str>) -> Source {
        Source {
            id: 1,
            name: "s".to_string(),
            kind: kind.map(String::from),
            url_or_config: url.map(String::from),
            created_at: None,
        }
    }

    #[test]
    fn article_with_only_required_fields() {
        let article: Article = serde_json::from_str(r#"{"id":1,"title":"X","tags":[]}"#).unwrap();
        assert_eq!(article.id, 1);
        assert_eq!(article.title, "X");
        assert!(article.url.is_none());
        assert!(article.published_at.is_none());
        assert!(article.tags.is_empty());
    }

    #[test]
    fn article_accepts_naive_and_offset_timestamps() {
        let json = r#"{
            "id": 7,
            "title": "T",
            "url": "https://example.com/t",
            "source_id": 3,
            "published_at": "2024-01-02T08:30:00",
            "created_at": "2024-01-02T09:00:00+02:00",
            "tags": [{"id": 5, "name": "ai"}]
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();

        assert_eq!(
            article.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap())
        );
        assert_eq!(
            article.created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 7, 0, 0).unwrap())
        );
        assert_eq!(article.tags[0].name, "ai");
        assert_eq!(article.source_id, Some(3));
    }

    #[test]
    fn unparseable_timestamp_becomes_none() {
        let json = r#"{"id":1,"title":"X","published_at":"yesterday"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert!(article.published_at.is_none());
    }

    #[test]
    fn source_reads_wire_field_names() {
        let json = r#"{"id":2,"name":"HN","type_or_kind":"rss","url_or_config":"https://hn/rss"}"#;
        let src: Source = serde_json::from_str(json).unwrap();
        assert_eq!(src.kind.as_deref(), Some("rss"));
        assert_eq!(src.feed_url(), Some("https://hn/rss"));
    }

    #[test]
    fn collectable_requires_known_kind_and_url() {
        assert!(source(Some("rss"), Some("https://a")).is_collectable());
        assert!(source(Some("API"), Some(" https://a ")).is_collectable());
        assert!(source(Some("Rss"), Some("https://a")).is_collectable());

        assert!(!source(Some("manual"), Some("https://a")).is_collectable());
        assert!(!source(None, Some("https://a")).is_collectable());
        assert!(!source(Some("rss"), Some("   ")).is_collectable());
        assert!(!source(Some("api"), None).is_collectable());
    }

    #[test]
    fn collect_result_defaults_from_empty_object() {
        let result: CollectRunResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result, CollectRunResult::default());

        let single: SourceCollectResult = serde_json::from_str("{}").unwrap();
        assert!(!single.ok);
        assert!(single.articles_added.is_none());
    }

    #[test]
    fn patch_omits_untouched_fields_and_nulls_cleared_ones() {
        let patch = SourcePatch {
            name: None,
            type_or_kind: Some(None),
            url_or_config: Some(Some("https://b".into())),
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type_or_kind": null, "url_or_config": "https://b"})
        );
        assert!(SourcePatch::default().is_empty());
    }

    #[test]
    fn query_pairs_skip_unset_filters() {
        let query = ArticleQuery {
            source_id: Some(3),
            tag_id: None,
            date_from: None,
            date_to: NaiveDate::from_ymd_opt(2024, 2, 1),
            limit: 20,
            offset: 0,
        };
        let pairs = query.pairs();
        assert_eq!(
            pairs,
            vec![
                ("source_id", "3".to_string()),
                ("date_to", "2024-02-01".to_string()),
                ("limit", "20".to_string()),
                ("offset", "0".to_string()),
            ]
        );
    }
}
