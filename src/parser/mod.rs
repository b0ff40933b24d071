//! Feed Model Parser.
//!
//! Converts raw bytes in any of the three supported wire formats (RSS 2.0,
//! Atom, JSON Feed) into one canonical in-memory model. The XML dialects are
//! mapped onto the same raw shape as JSON Feed first, so canonicalization
//! (URL resolution, author inheritance, stable id fallback) happens in a
//! single place.

mod xml;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::app::{FreshetError, Result};

/// Format-neutral feed produced by [`parse`] and threaded through the
/// transform pipeline. Not persisted directly.
#[derive(Debug, Clone)]
pub struct CanonicalFeed {
    pub title: String,
    pub home_page_url: Option<String>,
    pub description: Option<String>,
    pub authors: Option<Vec<String>>,
    pub items: Vec<CanonicalItem>,
}

#[derive(Debug, Clone)]
pub struct CanonicalItem {
    /// Source-provided or computed identifier; the dedup key within a feed.
    pub id: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub date_published: Option<DateTime<Utc>>,
    pub authors: Option<Vec<String>>,
}

/// Raw feed shape shared by the JSON branch and the XML mappings, prior to
/// canonicalization. Field names follow the JSON Feed spec.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawFeed {
    pub title: Option<String>,
    pub home_page_url: Option<String>,
    pub feed_url: Option<String>,
    pub description: Option<String>,
    pub author: Option<RawAuthor>,
    pub authors: Option<Vec<RawAuthor>>,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawItem {
    pub id: Option<RawId>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub date_published: Option<RawDate>,
    pub author: Option<RawAuthor>,
    pub authors: Option<Vec<RawAuthor>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAuthor {
    pub name: Option<String>,
}

/// JSON Feed ids may arrive as strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(text) => text,
            RawId::Int(n) => n.to_string(),
            RawId::Float(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawDate {
    Epoch(i64),
    Text(String),
}

/// Parse raw bytes fetched from `feed_url`. Leading whitespace is ignored;
/// a `<` sniffs the XML branch, anything else must be JSON-Feed-shaped JSON.
pub fn parse(bytes: &[u8], feed_url: &Url) -> Result<CanonicalFeed> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_start();
    let raw = if trimmed.starts_with('<') {
        xml::parse(trimmed)?
    } else {
        serde_json::from_str(trimmed)
            .map_err(|e| FreshetError::Format(format!("invalid JSON feed: {e}")))?
    };
    canonicalize(raw, feed_url)
}

/// Parse an already-decoded JSON value, e.g. the output of the jq step.
pub fn parse_value(value: serde_json::Value, feed_url: &Url) -> Result<CanonicalFeed> {
    let raw: RawFeed = serde_json::from_value(value)
        .map_err(|e| FreshetError::Format(format!("invalid JSON feed: {e}")))?;
    canonicalize(raw, feed_url)
}

fn canonicalize(raw: RawFeed, feed_url: &Url) -> Result<CanonicalFeed> {
    let title = raw
        .title
        .filter(|title| !title.is_empty())
        .ok_or_else(|| FreshetError::Format("feed title is required".into()))?;

    // A self-declared feed_url, when absolute, becomes the resolution base.
    let base = raw
        .feed_url
        .as_deref()
        .and_then(|u| Url::parse(u).ok())
        .unwrap_or_else(|| feed_url.clone());

    let home_page_url = raw
        .home_page_url
        .as_deref()
        .and_then(|href| resolve(href, &base));
    let item_base = home_page_url.clone().unwrap_or(base);

    let feed_authors = author_names(raw.author, raw.authors);

    let items = raw
        .items
        .into_iter()
        .map(|item| canonicalize_item(item, &item_base, feed_authors.as_ref()))
        .collect();

    Ok(CanonicalFeed {
        title,
        home_page_url: home_page_url.map(|url| url.to_string()),
        description: raw.description.filter(|d| !d.is_empty()),
        authors: feed_authors,
        items,
    })
}

fn canonicalize_item(
    raw: RawItem,
    base: &Url,
    feed_authors: Option<&Vec<String>>,
) -> CanonicalItem {
    let date_published = raw.date_published.and_then(|date| match date {
        RawDate::Epoch(secs) => DateTime::<Utc>::from_timestamp(secs, 0),
        RawDate::Text(text) => {
            let parsed = parse_date(&text);
            if parsed.is_none() {
                tracing::debug!(date = %text, "dropping unparseable item date");
            }
            parsed
        }
    });

    // Fallback chain: source id, else raw URL, else a content hash that is
    // stable across reparses of identical input.
    let id = raw
        .id
        .map(RawId::into_string)
        .filter(|id| !id.is_empty())
        .or_else(|| raw.url.clone().filter(|url| !url.is_empty()))
        .unwrap_or_else(|| {
            content_hash(
                raw.title.as_deref(),
                raw.url.as_deref(),
                raw.content_html.as_deref(),
                date_published,
            )
        });

    let url = raw.url.as_deref().and_then(|href| resolve(href, base));
    let authors =
        author_names(raw.author, raw.authors).or_else(|| feed_authors.cloned());

    CanonicalItem {
        id,
        url: url.map(|url| url.to_string()),
        title: raw.title,
        content_html: raw.content_html,
        date_published,
        authors,
    }
}

fn resolve(href: &str, base: &Url) -> Option<Url> {
    match base.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!(href, %e, "dropping unresolvable URL");
            None
        }
    }
}

fn author_names(
    author: Option<RawAuthor>,
    authors: Option<Vec<RawAuthor>>,
) -> Option<Vec<String>> {
    let names: Vec<String> = authors
        .or_else(|| author.map(|a| vec![a]))?
        .into_iter()
        .filter_map(|author| author.name)
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

fn content_hash(
    title: Option<&str>,
    url: Option<&str>,
    content_html: Option<&str>,
    date_published: Option<DateTime<Utc>>,
) -> String {
    let fields = serde_json::json!([
        title,
        url,
        content_html,
        date_published.map(|date| date.to_rfc3339()),
    ]);
    let mut hasher = Sha256::new();
    hasher.update(fields.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
