use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{FreshetError, Result};
use crate::domain::{Feed, FeedPatch, FeedUpdate, Item, NewItem, PluginConfig, Subscription};
use crate::store::Store;

const FEED_COLUMNS: &str = "id, url, title, home_page, description, author, category, \
     refresh_secs, mark_read_secs, clean_secs, plugins, known_ids, \
     etag, last_modified, updated_at, created_at";

const ITEM_COLUMNS: &str = "id, feed_id, key, url, title, content_html, author, \
     published_at, read, star, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| FreshetError::Database(rusqlite::Error::InvalidQuery))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            FreshetError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

fn epoch(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

fn from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    // Corrupt JSON columns degrade to defaults rather than failing the row.
    let plugins: PluginConfig = row
        .get::<_, String>(10)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    let known_ids: Vec<String> = row
        .get::<_, String>(11)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    Ok(Feed {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        home_page: row.get(3)?,
        description: row.get(4)?,
        author: row.get(5)?,
        category: row.get(6)?,
        refresh_secs: row.get(7)?,
        mark_read_secs: row.get(8)?,
        clean_secs: row.get(9)?,
        plugins,
        known_ids,
        etag: row.get(12)?,
        last_modified: row.get(13)?,
        updated_at: row.get::<_, Option<i64>>(14)?.map(from_epoch),
        created_at: from_epoch(row.get(15)?),
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        key: row.get(2)?,
        url: row.get(3)?,
        title: row.get(4)?,
        content_html: row.get(5)?,
        author: row.get(6)?,
        published_at: row.get::<_, Option<i64>>(7)?.map(from_epoch),
        read: row.get::<_, i64>(8)? != 0,
        star: row.get::<_, i64>(9)? != 0,
        created_at: from_epoch(row.get(10)?),
        updated_at: row.get::<_, Option<i64>>(11)?.map(from_epoch),
    })
}

fn query_feed(conn: &Connection, id: i64) -> Result<Option<Feed>> {
    let feed = conn
        .query_row(
            &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
            params![id],
            feed_from_row,
        )
        .optional()?;
    Ok(feed)
}

impl Store for SqliteStore {
    fn subscribe(&self, subscription: &Subscription) -> Result<Feed> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO feeds (url, category, refresh_secs, mark_read_secs, clean_secs,
                                plugins, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                subscription.url,
                subscription.category,
                subscription.refresh_secs,
                subscription.mark_read_secs,
                subscription.clean_secs,
                subscription.plugins.to_json()?,
                epoch(Utc::now()),
            ],
        )?;

        let id = conn.last_insert_rowid();
        query_feed(&conn, id)?.ok_or(FreshetError::FeedNotFound(id))
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.lock()?;
        query_feed(&conn, id)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.lock()?;
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?1"),
                params![url],
                feed_from_row,
            )
            .optional()?;
        Ok(feed)
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY category, title, url"
        ))?;
        let feeds = stmt
            .query_map([], feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn due_feeds(&self, now: DateTime<Utc>) -> Result<Vec<Feed>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds
             WHERE refresh_secs IS NOT NULL
               AND (updated_at IS NULL OR ?1 - updated_at >= refresh_secs)
             ORDER BY COALESCE(updated_at, 0)"
        ))?;
        let feeds = stmt
            .query_map(params![epoch(now)], feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn patch_feed(&self, id: i64, patch: &FeedPatch) -> Result<Feed> {
        let conn = self.lock()?;
        let current = query_feed(&conn, id)?.ok_or(FreshetError::FeedNotFound(id))?;

        if let Some(ref url) = patch.url {
            conn.execute("UPDATE feeds SET url = ?1 WHERE id = ?2", params![url, id])?;
        }
        if let Some(ref category) = patch.category {
            conn.execute(
                "UPDATE feeds SET category = ?1 WHERE id = ?2",
                params![category, id],
            )?;
        }
        if let Some(refresh_secs) = patch.refresh_secs {
            conn.execute(
                "UPDATE feeds SET refresh_secs = ?1 WHERE id = ?2",
                params![refresh_secs, id],
            )?;
        }
        if let Some(mark_read_secs) = patch.mark_read_secs {
            conn.execute(
                "UPDATE feeds SET mark_read_secs = ?1 WHERE id = ?2",
                params![mark_read_secs, id],
            )?;
        }
        if let Some(clean_secs) = patch.clean_secs {
            conn.execute(
                "UPDATE feeds SET clean_secs = ?1 WHERE id = ?2",
                params![clean_secs, id],
            )?;
        }
        if let Some(ref plugins) = patch.plugins {
            let merged = current.plugins.merge_patch(plugins)?;
            conn.execute(
                "UPDATE feeds SET plugins = ?1 WHERE id = ?2",
                params![merged.to_json()?, id],
            )?;
        }

        query_feed(&conn, id)?.ok_or(FreshetError::FeedNotFound(id))
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(FreshetError::FeedNotFound(id));
        }
        Ok(())
    }

    fn item_seen(&self, feed_id: i64, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE feed_id = ?1 AND key = ?2",
            params![feed_id, key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn commit_refresh(
        &self,
        feed_id: i64,
        items: &[NewItem],
        update: &FeedUpdate,
    ) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = epoch(update.updated_at);

        let mut inserted = 0;
        for item in items {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO items
                     (feed_id, key, url, title, content_html, author, published_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    feed_id,
                    item.key,
                    item.url,
                    item.title,
                    item.content_html,
                    item.author,
                    item.published_at.map(epoch),
                    now,
                ],
            )?;
        }

        let updated = tx.execute(
            "UPDATE feeds SET title = ?1, home_page = ?2, description = ?3, author = ?4,
                              known_ids = ?5, etag = ?6, last_modified = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                update.title,
                update.home_page,
                update.description,
                update.author,
                serde_json::to_string(&update.known_ids)?,
                update.etag,
                update.last_modified,
                now,
                feed_id,
            ],
        )?;
        if updated == 0 {
            return Err(FreshetError::FeedNotFound(feed_id));
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn touch_feed(&self, feed_id: i64, updated_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE feeds SET updated_at = ?1 WHERE id = ?2",
            params![epoch(updated_at), feed_id],
        )?;
        if updated == 0 {
            return Err(FreshetError::FeedNotFound(feed_id));
        }
        Ok(())
    }

    fn list_items(&self, feed_id: i64) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE feed_id = ?1
             ORDER BY published_at IS NULL, published_at, id"
        ))?;
        let items = stmt
            .query_map(params![feed_id], item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn set_read(&self, item_id: i64, read: bool, now: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE items SET read = ?1, updated_at = ?2 WHERE id = ?3",
            params![read as i64, epoch(now), item_id],
        )?;
        Ok(())
    }

    fn set_star(&self, item_id: i64, star: bool, now: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE items SET star = ?1, updated_at = ?2 WHERE id = ?3",
            params![star as i64, epoch(now), item_id],
        )?;
        Ok(())
    }

    fn sweep_mark_read(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let touched = conn.execute(
            "UPDATE items SET read = 1, updated_at = ?1
             WHERE read = 0 AND star = 0 AND id IN (
                 SELECT items.id FROM items
                 JOIN feeds ON feeds.id = items.feed_id
                 WHERE feeds.mark_read_secs IS NOT NULL
                   AND ?1 - COALESCE(items.updated_at, items.created_at) >= feeds.mark_read_secs
             )",
            params![epoch(now)],
        )?;
        Ok(touched)
    }

    fn sweep_clean(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM items
             WHERE read = 1 AND star = 0 AND id IN (
                 SELECT items.id FROM items
                 JOIN feeds ON feeds.id = items.feed_id
                 WHERE feeds.clean_secs IS NOT NULL
                   AND ?1 - COALESCE(items.updated_at, items.created_at) >= feeds.clean_secs
             )",
            params![epoch(now)],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn subscribed(store: &SqliteStore, url: &str) -> Feed {
        store.subscribe(&Subscription::new(url)).unwrap()
    }

    fn new_item(key: &str) -> NewItem {
        NewItem {
            key: key.into(),
            url: Some(format!("https://example.com/{key}")),
            title: Some(key.to_uppercase()),
            content_html: None,
            author: None,
            published_at: None,
        }
    }

    fn update_at(when: DateTime<Utc>, known_ids: &[&str]) -> FeedUpdate {
        FeedUpdate {
            title: Some("Example".into()),
            known_ids: known_ids.iter().map(|s| s.to_string()).collect(),
            updated_at: when,
            ..Default::default()
        }
    }

    #[test]
    fn test_subscribe_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");

        assert_eq!(feed.url, "https://example.com/feed.xml");
        assert_eq!(feed.category, "Uncategorized");
        assert_eq!(feed.updated_at, None);
        assert!(feed.known_ids.is_empty());

        let by_id = store.get_feed(feed.id).unwrap().unwrap();
        assert_eq!(by_id.url, feed.url);
        let by_url = store
            .get_feed_by_url("https://example.com/feed.xml")
            .unwrap();
        assert_eq!(by_url.unwrap().id, feed.id);
        assert!(store.get_feed(999).unwrap().is_none());
    }

    #[test]
    fn test_subscribe_duplicate_url_fails() {
        let store = SqliteStore::in_memory().unwrap();
        subscribed(&store, "https://example.com/feed.xml");
        let err = store
            .subscribe(&Subscription::new("https://example.com/feed.xml"))
            .unwrap_err();
        assert!(matches!(err, FreshetError::Database(_)));
    }

    #[test]
    fn test_patch_feed_fields() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");

        let patched = store
            .patch_feed(
                feed.id,
                &FeedPatch {
                    category: Some("Tech".into()),
                    refresh_secs: Some(Some(900)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.category, "Tech");
        assert_eq!(patched.refresh_secs, Some(900));

        // Untouched fields keep their value; Some(None) sets back to never.
        let patched = store
            .patch_feed(
                feed.id,
                &FeedPatch {
                    refresh_secs: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.category, "Tech");
        assert_eq!(patched.refresh_secs, None);
    }

    #[test]
    fn test_patch_feed_merges_plugins() {
        let store = SqliteStore::in_memory().unwrap();
        let mut subscription = Subscription::new("https://example.com/feed.xml");
        subscription.plugins = PluginConfig::parse(r#"{"jq": ".feed", "limit": 5}"#).unwrap();
        let feed = store.subscribe(&subscription).unwrap();

        let patched = store
            .patch_feed(
                feed.id,
                &FeedPatch {
                    plugins: Some(json!({"limit": 10, "jq": null})),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.plugins.limit, Some(10));
        assert_eq!(patched.plugins.jq, None);
    }

    #[test]
    fn test_patch_missing_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.patch_feed(42, &FeedPatch::default()).unwrap_err();
        assert!(matches!(err, FreshetError::FeedNotFound(42)));
    }

    #[test]
    fn test_delete_feed_cascades_items() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");
        store
            .commit_refresh(feed.id, &[new_item("a")], &update_at(t0(), &["a"]))
            .unwrap();

        store.delete_feed(feed.id).unwrap();
        assert!(store.get_feed(feed.id).unwrap().is_none());
        assert!(!store.item_seen(feed.id, "a").unwrap());

        let err = store.delete_feed(feed.id).unwrap_err();
        assert!(matches!(err, FreshetError::FeedNotFound(_)));
    }

    #[test]
    fn test_commit_refresh_inserts_and_updates_metadata() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");

        let mut update = update_at(t0(), &["a", "b"]);
        update.etag = Some("\"v1\"".into());
        let inserted = store
            .commit_refresh(feed.id, &[new_item("a"), new_item("b")], &update)
            .unwrap();
        assert_eq!(inserted, 2);

        let feed = store.get_feed(feed.id).unwrap().unwrap();
        assert_eq!(feed.title.as_deref(), Some("Example"));
        assert_eq!(feed.etag.as_deref(), Some("\"v1\""));
        assert_eq!(feed.known_ids, ["a", "b"]);
        assert_eq!(feed.updated_at, Some(t0()));
    }

    #[test]
    fn test_commit_refresh_is_idempotent_on_keys() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");

        store
            .commit_refresh(feed.id, &[new_item("a")], &update_at(t0(), &["a"]))
            .unwrap();
        // Same key again: the unique index rejects the row.
        let inserted = store
            .commit_refresh(
                feed.id,
                &[new_item("a"), new_item("b")],
                &update_at(t0(), &["a", "b"]),
            )
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.list_items(feed.id).unwrap().len(), 2);
    }

    #[test]
    fn test_same_key_allowed_across_feeds() {
        let store = SqliteStore::in_memory().unwrap();
        let first = subscribed(&store, "https://example.com/a.xml");
        let second = subscribed(&store, "https://example.com/b.xml");

        store
            .commit_refresh(first.id, &[new_item("shared")], &update_at(t0(), &["shared"]))
            .unwrap();
        let inserted = store
            .commit_refresh(second.id, &[new_item("shared")], &update_at(t0(), &["shared"]))
            .unwrap();
        assert_eq!(inserted, 1);
        assert!(store.item_seen(first.id, "shared").unwrap());
        assert!(store.item_seen(second.id, "shared").unwrap());
    }

    #[test]
    fn test_touch_feed_records_not_modified_refresh() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");
        store.touch_feed(feed.id, t0()).unwrap();
        assert_eq!(store.get_feed(feed.id).unwrap().unwrap().updated_at, Some(t0()));
    }

    #[test]
    fn test_due_feeds_boundaries() {
        let store = SqliteStore::in_memory().unwrap();
        let mut subscription = Subscription::new("https://example.com/feed.xml");
        subscription.refresh_secs = Some(3600);
        let feed = store.subscribe(&subscription).unwrap();
        // Second feed without an interval never becomes due.
        subscribed(&store, "https://example.com/manual.xml");

        // Never refreshed: due immediately.
        assert_eq!(store.due_feeds(t0()).unwrap().len(), 1);

        store.touch_feed(feed.id, t0()).unwrap();
        let almost = t0() + chrono::Duration::seconds(3599);
        assert!(store.due_feeds(almost).unwrap().is_empty());
        let exact = t0() + chrono::Duration::seconds(3600);
        assert_eq!(store.due_feeds(exact).unwrap().len(), 1);
    }

    #[test]
    fn test_list_items_oldest_first_undated_last() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");

        let mut newer = new_item("newer");
        newer.published_at = Some(t0() + chrono::Duration::days(1));
        let mut older = new_item("older");
        older.published_at = Some(t0());
        let undated = new_item("undated");

        store
            .commit_refresh(
                feed.id,
                &[undated, newer, older],
                &update_at(t0(), &["undated", "newer", "older"]),
            )
            .unwrap();

        let keys: Vec<String> = store
            .list_items(feed.id)
            .unwrap()
            .into_iter()
            .map(|item| item.key)
            .collect();
        assert_eq!(keys, ["older", "newer", "undated"]);
    }

    #[test]
    fn test_set_read_and_star() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = subscribed(&store, "https://example.com/feed.xml");
        store
            .commit_refresh(feed.id, &[new_item("a")], &update_at(t0(), &["a"]))
            .unwrap();
        let item = &store.list_items(feed.id).unwrap()[0];
        assert!(!item.read && !item.star);

        store.set_read(item.id, true, t0()).unwrap();
        store.set_star(item.id, true, t0()).unwrap();
        let item = &store.list_items(feed.id).unwrap()[0];
        assert!(item.read && item.star);
        assert_eq!(item.updated_at, Some(t0()));

        store.set_read(item.id, false, t0()).unwrap();
        assert!(!store.list_items(feed.id).unwrap()[0].read);
    }

    #[test]
    fn test_sweep_mark_read_age_boundary() {
        let store = SqliteStore::in_memory().unwrap();
        let mut subscription = Subscription::new("https://example.com/feed.xml");
        subscription.mark_read_secs = Some(86400);
        let feed = store.subscribe(&subscription).unwrap();
        store
            .commit_refresh(feed.id, &[new_item("a")], &update_at(t0(), &["a"]))
            .unwrap();

        let almost = t0() + chrono::Duration::seconds(86399);
        assert_eq!(store.sweep_mark_read(almost).unwrap(), 0);

        let exact = t0() + chrono::Duration::seconds(86400);
        assert_eq!(store.sweep_mark_read(exact).unwrap(), 1);
        assert!(store.list_items(feed.id).unwrap()[0].read);
    }

    #[test]
    fn test_sweep_mark_read_skips_starred_and_unconfigured() {
        let store = SqliteStore::in_memory().unwrap();
        let mut subscription = Subscription::new("https://example.com/feed.xml");
        subscription.mark_read_secs = Some(60);
        let feed = store.subscribe(&subscription).unwrap();
        let untracked = subscribed(&store, "https://example.com/other.xml");

        store
            .commit_refresh(
                feed.id,
                &[new_item("starred"), new_item("plain")],
                &update_at(t0(), &["starred", "plain"]),
            )
            .unwrap();
        store
            .commit_refresh(untracked.id, &[new_item("a")], &update_at(t0(), &["a"]))
            .unwrap();

        let starred = store
            .list_items(feed.id)
            .unwrap()
            .into_iter()
            .find(|item| item.key == "starred")
            .unwrap();
        store.set_star(starred.id, true, t0()).unwrap();

        let later = t0() + chrono::Duration::days(30);
        assert_eq!(store.sweep_mark_read(later).unwrap(), 1);

        let items = store.list_items(feed.id).unwrap();
        for item in &items {
            if item.key == "starred" {
                assert!(!item.read, "starred items are immune");
            } else {
                assert!(item.read);
            }
        }
        assert!(!store.list_items(untracked.id).unwrap()[0].read);
    }

    #[test]
    fn test_sweep_clean_deletes_only_read_unstarred() {
        let store = SqliteStore::in_memory().unwrap();
        let mut subscription = Subscription::new("https://example.com/feed.xml");
        subscription.clean_secs = Some(3600);
        let feed = store.subscribe(&subscription).unwrap();

        store
            .commit_refresh(
                feed.id,
                &[new_item("read"), new_item("unread"), new_item("starred")],
                &update_at(t0(), &["read", "unread", "starred"]),
            )
            .unwrap();
        for item in store.list_items(feed.id).unwrap() {
            match item.key.as_str() {
                "read" => store.set_read(item.id, true, t0()).unwrap(),
                "starred" => {
                    store.set_read(item.id, true, t0()).unwrap();
                    store.set_star(item.id, true, t0()).unwrap();
                }
                _ => {}
            }
        }

        let almost = t0() + chrono::Duration::seconds(3599);
        assert_eq!(store.sweep_clean(almost).unwrap(), 0);

        let exact = t0() + chrono::Duration::seconds(3600);
        assert_eq!(store.sweep_clean(exact).unwrap(), 1);

        let keys: Vec<String> = store
            .list_items(feed.id)
            .unwrap()
            .into_iter()
            .map(|item| item.key)
            .collect();
        assert_eq!(keys, ["unread", "starred"]);
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freshet.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            subscribed(&store, "https://example.com/feed.xml");
        }
        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.list_feeds().unwrap().len(), 1);
    }
}
