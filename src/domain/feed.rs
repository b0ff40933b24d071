use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::plugins::PluginConfig;
use crate::domain::DEFAULT_CATEGORY;

/// A persisted subscription row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub home_page: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub category: String,
    /// Seconds between scheduled refreshes; `None` means never refreshed
    /// automatically.
    pub refresh_secs: Option<i64>,
    /// Unread, unstarred items older than this are marked read by the
    /// sweeper; `None` means never.
    pub mark_read_secs: Option<i64>,
    /// Read, unstarred items older than this are deleted by the sweeper;
    /// `None` means never.
    pub clean_secs: Option<i64>,
    pub plugins: PluginConfig,
    /// Item keys seen on the most recent fetch. A sliding window used as a
    /// cheap pre-check before the durable `(feed_id, key)` lookup.
    pub known_ids: Vec<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// Last successful refresh; `None` until the first one.
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Feed {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Input to `subscribe`.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub url: String,
    pub category: String,
    pub refresh_secs: Option<i64>,
    pub mark_read_secs: Option<i64>,
    pub clean_secs: Option<i64>,
    pub plugins: PluginConfig,
}

impl Subscription {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category: DEFAULT_CATEGORY.to_string(),
            refresh_secs: None,
            mark_read_secs: None,
            clean_secs: None,
            plugins: PluginConfig::default(),
        }
    }
}

/// Feed bookkeeping written after a successful refresh. Overwrites the
/// last-known metadata and replaces the known-ids window wholesale.
#[derive(Debug, Clone, Default)]
pub struct FeedUpdate {
    pub title: Option<String>,
    pub home_page: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub known_ids: Vec<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial edit of a subscription. `None` leaves a field untouched;
/// the double-`Option` knobs distinguish "don't change" from "set to never".
/// `plugins` is applied as a JSON merge-patch over the stored configuration.
#[derive(Debug, Clone, Default)]
pub struct FeedPatch {
    pub url: Option<String>,
    pub category: Option<String>,
    pub refresh_secs: Option<Option<i64>>,
    pub mark_read_secs: Option<Option<i64>>,
    pub clean_secs: Option<Option<i64>>,
    pub plugins: Option<serde_json::Value>,
}
