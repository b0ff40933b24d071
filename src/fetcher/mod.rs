pub mod http_fetcher;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::PluginConfig;

pub use http_fetcher::HttpFetcher;

/// Per-request knobs. Headers and proxy come from the feed's plugin
/// configuration; the validators drive conditional GET.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions<'a> {
    pub headers: Option<&'a HashMap<String, String>>,
    pub proxy: Option<&'a str>,
    pub etag: Option<&'a str>,
    pub last_modified: Option<&'a str>,
}

impl<'a> FetchOptions<'a> {
    /// Headers and proxy for a scrape fetch; validators don't apply there.
    pub fn from_plugins(plugins: &'a PluginConfig) -> Self {
        Self {
            headers: plugins.request_header.as_ref(),
            proxy: plugins.proxy.as_deref(),
            etag: None,
            last_modified: None,
        }
    }
}

#[derive(Debug)]
pub enum FetchResult {
    /// New content, status 200.
    Content {
        body: Vec<u8>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    /// HTTP 304 against the supplied validators.
    NotModified,
}

impl FetchResult {
    /// The body of a `Content` response; `NotModified` is an error for
    /// callers that did not send validators (e.g. scrape fetches).
    pub fn into_body(self) -> Result<Vec<u8>> {
        match self {
            FetchResult::Content { body, .. } => Ok(body),
            FetchResult::NotModified => Err(crate::app::FreshetError::Other(
                "unexpected 304 response without validators".into(),
            )),
        }
    }
}

/// Seam for HTTP access. The refresh engine and the scraper step both go
/// through this trait, which lets tests run against canned responses.
/// Implementations are shared across spawned refresh tasks, hence the
/// `Send + Sync` bound.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: FetchOptions<'_>) -> Result<FetchResult>;
}
