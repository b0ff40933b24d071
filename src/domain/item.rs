use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::CanonicalItem;

/// A persisted feed entry. `key` is unique per feed, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub feed_id: i64,
    pub key: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub read: bool,
    pub star: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}

/// A row staged for insertion during a refresh, produced from a rewritten
/// canonical item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub key: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<CanonicalItem> for NewItem {
    fn from(item: CanonicalItem) -> Self {
        Self {
            key: item.id,
            url: item.url,
            title: item.title,
            content_html: item.content_html,
            author: item.authors.as_deref().map(join_authors),
            published_at: item.date_published,
        }
    }
}

/// Join author names into one column. Names containing a comma are quoted so
/// the list stays splittable.
pub fn join_authors(names: &[String]) -> String {
    names
        .iter()
        .map(|name| {
            if name.contains(',') {
                serde_json::to_string(name).unwrap_or_else(|_| name.clone())
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
