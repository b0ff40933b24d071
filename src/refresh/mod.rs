//! Feed refresh engine.
//!
//! One refresh is fetch, parse, dedup, per-item rewrite, then a single
//! transactional commit. Fetch and parse failures abort the whole refresh
//! (the feed retries later under backoff); a transform or scrape failure
//! while rewriting one item only skips that item, and leaves it out of the
//! recorded known-ids window so the next refresh picks it up again.

pub mod backoff;
pub mod scheduler;

use chrono::Utc;
use url::Url;

use crate::app::Result;
use crate::domain::{join_authors, Feed, FeedUpdate, NewItem};
use crate::fetcher::Fetcher;
use crate::pipeline::{FetchedFeed, Pipeline};
use crate::store::Store;

pub use scheduler::{RefreshReport, Scheduler, SchedulerConfig};

pub struct RefreshEngine {
    pipeline: Pipeline,
}

impl RefreshEngine {
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::new(),
        }
    }

    /// Refresh one feed. Returns the number of newly inserted items.
    pub async fn refresh_feed(
        &self,
        store: &dyn Store,
        fetcher: &dyn Fetcher,
        feed: &Feed,
    ) -> Result<usize> {
        let url = Url::parse(&feed.url)?;

        let fetched = self
            .pipeline
            .fetch_feed(
                fetcher,
                &url,
                &feed.plugins,
                feed.etag.as_deref(),
                feed.last_modified.as_deref(),
            )
            .await?;

        let (canonical, etag, last_modified) = match fetched {
            FetchedFeed::NotModified => {
                tracing::debug!(feed = %feed.url, "not modified");
                store.touch_feed(feed.id, Utc::now())?;
                return Ok(0);
            }
            FetchedFeed::Fetched {
                feed,
                etag,
                last_modified,
            } => (feed, etag, last_modified),
        };

        // Two-stage dedup: the known-ids window from the previous fetch is a
        // cheap membership check, the unique (feed_id, key) index is the
        // durable one.
        let mut window = Vec::with_capacity(canonical.items.len());
        let mut fresh = Vec::new();
        for item in canonical.items {
            let key = item.id.clone();
            if feed.known_ids.contains(&key) || store.item_seen(feed.id, &key)? {
                window.push(key);
                continue;
            }
            match self
                .pipeline
                .rewrite_item(
                    fetcher,
                    &url,
                    canonical.home_page_url.as_deref(),
                    item,
                    &feed.plugins,
                )
                .await
            {
                Ok(rewritten) => {
                    window.push(key);
                    fresh.push(NewItem::from(rewritten));
                }
                Err(e) if e.is_transform() => {
                    tracing::warn!(feed = %feed.url, item = %key, error = %e, "skipping item");
                }
                Err(e) => return Err(e),
            }
        }

        let update = FeedUpdate {
            title: Some(canonical.title),
            home_page: canonical.home_page_url,
            description: canonical.description,
            author: canonical.authors.as_deref().map(join_authors),
            known_ids: window,
            etag,
            last_modified,
            updated_at: Utc::now(),
        };
        let inserted = store.commit_refresh(feed.id, &fresh, &update)?;

        tracing::info!(feed = %feed.url, new_items = inserted, "refreshed");
        Ok(inserted)
    }
}

impl Default for RefreshEngine {
    fn default() -> Self {
        Self::new()
    }
}
