use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::refresh::Scheduler;
use crate::store::{SqliteStore, Store};

/// Shared application state: configuration, the store, and the scheduler
/// wired to the real HTTP fetcher.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub scheduler: Scheduler,
}

impl AppContext {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path)?;
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(config.database_path()?)?);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::with_timeout(
            Duration::from_secs(config.fetch.timeout_secs),
        ));
        let scheduler = Scheduler::new(store.clone(), fetcher, config.scheduler_config());
        Ok(Self {
            config,
            store,
            scheduler,
        })
    }
}
