//! Background refresh scheduler.
//!
//! A fixed-interval tick drives everything: the retention sweeps run first,
//! then every due feed that is not under backoff is refreshed, a bounded
//! number at a time. Manual refreshes go through the same engine but bypass
//! both the schedule and the backoff.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::interval;

use crate::app::{FreshetError, Result};
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::refresh::backoff::RetryTracker;
use crate::refresh::RefreshEngine;
use crate::store::Store;

pub const DEFAULT_TICK_SECS: u64 = 60;
pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between scheduler passes.
    pub tick_secs: u64,
    /// Maximum concurrent feed refreshes.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Aggregate outcome of one pass or one `refresh_all`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshReport {
    pub feeds: usize,
    pub new_items: usize,
    pub errors: usize,
}

pub struct Scheduler {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<RefreshEngine>,
    semaphore: Arc<Semaphore>,
    tracker: Mutex<RetryTracker>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            engine: Arc::new(RefreshEngine::new()),
            semaphore: Arc::new(Semaphore::new(config.workers.max(1))),
            tracker: Mutex::new(RetryTracker::new(config.tick_secs as i64)),
            config,
        }
    }

    /// Run scheduler passes forever.
    pub async fn run(&self) {
        tracing::info!(
            tick_secs = self.config.tick_secs,
            workers = self.config.workers,
            "scheduler started"
        );
        let mut timer = interval(Duration::from_secs(self.config.tick_secs.max(1)));
        loop {
            timer.tick().await;
            self.tick(Utc::now()).await;
        }
    }

    /// One scheduler pass at `now`: sweeps, then due-and-not-suppressed
    /// feeds. Sweep failures are logged, never fatal.
    pub async fn tick(&self, now: DateTime<Utc>) -> RefreshReport {
        match self.store.sweep_mark_read(now) {
            Ok(0) => {}
            Ok(marked) => tracing::info!(marked, "marked aged items read"),
            Err(e) => tracing::error!(error = %e, "mark-read sweep failed"),
        }
        match self.store.sweep_clean(now) {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "cleaned aged items"),
            Err(e) => tracing::error!(error = %e, "clean sweep failed"),
        }

        let due = match self.store.due_feeds(now) {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "could not list due feeds");
                return RefreshReport::default();
            }
        };
        let runnable: Vec<Feed> = {
            let tracker = self.tracker.lock().expect("tracker lock");
            due.into_iter()
                .filter(|feed| {
                    let refresh = feed.refresh_secs.unwrap_or(self.config.tick_secs as i64);
                    !tracker.suppressed(feed.id, refresh, now)
                })
                .collect()
        };

        self.refresh_many(runnable, now).await
    }

    /// Refresh one feed immediately, regardless of schedule or backoff.
    pub async fn refresh(&self, feed_id: i64) -> Result<usize> {
        let feed = self
            .store
            .get_feed(feed_id)?
            .ok_or(FreshetError::FeedNotFound(feed_id))?;
        let result = self
            .engine
            .refresh_feed(self.store.as_ref(), self.fetcher.as_ref(), &feed)
            .await;
        self.note_outcome(&feed, &result, Utc::now());
        result
    }

    /// Refresh every subscription immediately.
    pub async fn refresh_all(&self) -> Result<RefreshReport> {
        let feeds = self.store.list_feeds()?;
        Ok(self.refresh_many(feeds, Utc::now()).await)
    }

    async fn refresh_many(&self, feeds: Vec<Feed>, now: DateTime<Utc>) -> RefreshReport {
        let mut handles = Vec::with_capacity(feeds.len());
        for feed in feeds {
            let engine = self.engine.clone();
            let fetcher = self.fetcher.clone();
            let store = self.store.clone();
            let semaphore = self.semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let result = engine
                    .refresh_feed(store.as_ref(), fetcher.as_ref(), &feed)
                    .await;
                (feed, result)
            }));
        }

        let mut report = RefreshReport::default();
        for joined in join_all(handles).await {
            match joined {
                Ok((feed, result)) => {
                    report.feeds += 1;
                    match &result {
                        Ok(inserted) => report.new_items += inserted,
                        Err(_) => report.errors += 1,
                    }
                    self.note_outcome(&feed, &result, now);
                }
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(error = %e, "refresh task panicked");
                }
            }
        }
        report
    }

    fn note_outcome(&self, feed: &Feed, result: &Result<usize>, now: DateTime<Utc>) {
        let mut tracker = self.tracker.lock().expect("tracker lock");
        match result {
            Ok(_) => tracker.record_success(feed.id),
            Err(e) => {
                tracing::warn!(feed = %feed.url, error = %e, "refresh failed");
                tracker.record_failure(feed.id, e.to_string(), now);
            }
        }
    }
}
