pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, FeedPatch, FeedUpdate, Item, NewItem, Subscription};

pub use sqlite::SqliteStore;

/// Persistence seam. Timestamps are passed in by the caller so schedule and
/// retention decisions stay deterministic under test.
pub trait Store: Send + Sync {
    // Feed operations
    fn subscribe(&self, subscription: &Subscription) -> Result<Feed>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn list_feeds(&self) -> Result<Vec<Feed>>;
    /// Feeds whose refresh interval has elapsed at `now`, oldest first.
    fn due_feeds(&self, now: DateTime<Utc>) -> Result<Vec<Feed>>;
    fn patch_feed(&self, id: i64, patch: &FeedPatch) -> Result<Feed>;
    fn delete_feed(&self, id: i64) -> Result<()>;

    // Refresh bookkeeping
    /// Durable dedup check against the unique `(feed_id, key)` index.
    fn item_seen(&self, feed_id: i64, key: &str) -> Result<bool>;
    /// Atomically insert new items and overwrite the feed's refresh metadata
    /// (title, validators, known-ids window, `updated_at`). Returns the
    /// number of rows actually inserted.
    fn commit_refresh(&self, feed_id: i64, items: &[NewItem], update: &FeedUpdate)
        -> Result<usize>;
    /// Record a refresh that produced no new content (HTTP 304).
    fn touch_feed(&self, feed_id: i64, updated_at: DateTime<Utc>) -> Result<()>;

    // Item operations
    /// Items of one feed, oldest published first, undated items last.
    fn list_items(&self, feed_id: i64) -> Result<Vec<Item>>;
    fn set_read(&self, item_id: i64, read: bool, now: DateTime<Utc>) -> Result<()>;
    fn set_star(&self, item_id: i64, star: bool, now: DateTime<Utc>) -> Result<()>;

    // Retention sweeps
    //
    // Item age is measured from the last read/star mutation, falling back to
    // insertion time. Starred items are never touched.
    /// Mark unread, unstarred items read once older than their feed's
    /// `mark_read_secs`. Returns the number of rows touched.
    fn sweep_mark_read(&self, now: DateTime<Utc>) -> Result<usize>;
    /// Delete read, unstarred items once older than their feed's
    /// `clean_secs`. Returns the number of rows deleted.
    fn sweep_clean(&self, now: DateTime<Utc>) -> Result<usize>;
}
