//! Local feed probing.
//!
//! Lets the user check that a source's URL actually yields articles before
//! waiting on a server-side collection.  Parsing mirrors what the collector
//! accepts: RSS channels or Atom feeds whose entries carry a link, or a JSON
//! array of rows carrying `url` (or `link`).
//!
//! The parse functions are pure (no I/O) so tests can exercise them without
//! the network; [`fetch`] is the thin HTTP wrapper around them.

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::api::FeedKind;

/// What a probe found at a feed URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Entries the collector would store.
    pub usable: usize,
    /// Entries dropped for lacking a link.
    pub skipped: usize,
    /// Title of the first usable entry.
    pub first_title: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not an RSS or Atom feed: {rss}")]
    NotAFeed {
        rss: rss::Error,
        atom: atom_syndication::Error,
    },
    #[error("not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of articles")]
    NotAnArray,
}

// Feed hosts such as RSSHub turn away clients without a browser-like agent.
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml, */*";
const JSON_ACCEPT: &str = "application/json, */*";

/// Fetch `url` and parse it as `kind`.  Redirects are followed.
pub async fn fetch(http: &Client, kind: FeedKind, url: &str) -> Result<ProbeReport, ProbeError> {
    let accept = match kind {
        FeedKind::Rss => FEED_ACCEPT,
        FeedKind::Api => JSON_ACCEPT,
    };
    let body = http
        .get(url)
        .header(USER_AGENT, BROWSER_AGENT)
        .header(ACCEPT, accept)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    match kind {
        FeedKind::Rss => parse_feed(&body),
        FeedKind::Api => parse_api(&body),
    }
}

/// Parse an RSS 2.0 channel, falling back to Atom.
pub fn parse_feed(body: &[u8]) -> Result<ProbeReport, ProbeError> {
    let rss = match rss::Channel::read_from(body) {
        Ok(channel) => return Ok(parse_channel(&channel)),
        Err(e) => e,
    };
    match atom_syndication::Feed::read_from(body) {
        Ok(feed) => Ok(parse_atom(&feed)),
        Err(atom) => Err(ProbeError::NotAFeed { rss, atom }),
    }
}

/// Summarise an already-parsed [`rss::Channel`].
pub fn parse_channel(channel: &rss::Channel) -> ProbeReport {
    let mut report = ProbeReport::default();
    for item in channel.items() {
        let has_link = item.link().is_some_and(|link| !link.trim().is_empty());
        if !has_link {
            report.skipped += 1;
            continue;
        }
        report.usable += 1;
        if report.first_title.is_none() {
            report.first_title = Some(display_title(item.title()));
        }
    }
    report
}

/// Summarise an Atom feed.  An entry's link is its `alternate` link, else
/// its first link.
pub fn parse_atom(feed: &atom_syndication::Feed) -> ProbeReport {
    let mut report = ProbeReport::default();
    for entry in feed.entries() {
        let link = entry
            .links()
            .iter()
            .find(|l| l.rel() == "alternate")
            .or_else(|| entry.links().first())
            .map(|l| l.href().trim())
            .unwrap_or_default();
        if link.is_empty() {
            report.skipped += 1;
            continue;
        }
        report.usable += 1;
        if report.first_title.is_none() {
            report.first_title = Some(display_title(Some(entry.title().value.as_str())));
        }
    }
    report
}

/// Summarise a JSON API response body.  A row's link is the first of `url`
/// and `link` that is a non-blank string.
pub fn parse_api(body: &[u8]) -> Result<ProbeReport, ProbeError> {
    let Value::Array(rows) = serde_json::from_slice::<Value>(body)? else {
        return Err(ProbeError::NotAnArray);
    };

    let mut report = ProbeReport::default();
    for row in &rows {
        let link = ["url", "link"]
            .iter()
            .filter_map(|key| row.get(key).and_then(Value::as_str))
            .map(str::trim)
            .find(|link| !link.is_empty())
            .unwrap_or_default();
        if link.is_empty() {
            report.skipped += 1;
            continue;
        }
        report.usable += 1;
        if report.first_title.is_none() {
            report.first_title = Some(display_title(row.get("title").and_then(Value::as_str)));
        }
    }
    Ok(report)
}

fn display_title(title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("(untitled)")
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
