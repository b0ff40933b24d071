//! Per-feed transform pipeline.
//!
//! Two entry points: [`Pipeline::fetch_feed`] turns a feed URL into a parsed,
//! trimmed, sorted [`CanonicalFeed`]; [`Pipeline::rewrite_item`] runs the
//! per-item steps (URL rewrite, page scrape, content rewrite) on one item.
//! Step order is fixed regardless of configuration order:
//! jq, limit, sort at the feed level; urlRewrite, scraper, remove /
//! rewriteImageUrl / sanitize at the item level.

pub mod html;
mod jq;
pub mod url_rewrite;

use url::Url;

use crate::app::{FreshetError, Result};
use crate::domain::PluginConfig;
use crate::fetcher::{FetchOptions, FetchResult, Fetcher};
use crate::parser::{self, CanonicalFeed, CanonicalItem};

pub use html::{ContentRewriter, HtmlOptions};

/// Outcome of a conditional feed fetch.
pub enum FetchedFeed {
    /// The server confirmed the cached validators; nothing to parse.
    NotModified,
    Fetched {
        feed: CanonicalFeed,
        etag: Option<String>,
        last_modified: Option<String>,
    },
}

pub struct Pipeline {
    content: ContentRewriter,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            content: ContentRewriter::new(),
        }
    }

    /// Fetch and parse a feed, honoring stored validators and the feed-level
    /// plugin steps. Items come back sorted oldest first; items without a
    /// publication date sort last.
    pub async fn fetch_feed(
        &self,
        fetcher: &dyn Fetcher,
        url: &Url,
        plugins: &PluginConfig,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<FetchedFeed> {
        let options = FetchOptions {
            headers: plugins.request_header.as_ref(),
            proxy: plugins.proxy.as_deref(),
            etag,
            last_modified,
        };
        let (body, etag, last_modified) = match fetcher.fetch(url.as_str(), options).await? {
            FetchResult::NotModified => return Ok(FetchedFeed::NotModified),
            FetchResult::Content {
                body,
                etag,
                last_modified,
            } => (body, etag, last_modified),
        };

        let mut feed = match plugins.jq.as_deref() {
            Some(program) => parser::parse_value(jq::apply_bytes(program, &body)?, url)?,
            None => parser::parse(&body, url)?,
        };

        if let Some(limit) = plugins.limit {
            feed.items.truncate(limit);
        }
        sort_items(&mut feed.items);

        Ok(FetchedFeed::Fetched {
            feed,
            etag,
            last_modified,
        })
    }

    /// Run the per-item steps on one item. Scrape fetches reuse the feed's
    /// proxy and header configuration but never send validators.
    pub async fn rewrite_item(
        &self,
        fetcher: &dyn Fetcher,
        feed_url: &Url,
        home_page: Option<&str>,
        mut item: CanonicalItem,
        plugins: &PluginConfig,
    ) -> Result<CanonicalItem> {
        if let (Some(template), Some(url)) = (plugins.url_rewrite.as_deref(), item.url.as_deref())
        {
            let parsed = Url::parse(url).map_err(|e| {
                FreshetError::Transform(format!("unparsable item URL {url:?}: {e}"))
            })?;
            item.url = Some(url_rewrite::url_replace(&parsed, template)?);
        }

        let mut content = item.content_html.take();
        if plugins.scraper.is_some() {
            let url = item.url.as_deref().ok_or_else(|| {
                FreshetError::Scrape(format!("item {:?} has no URL to scrape", item.id))
            })?;
            let page = fetcher
                .fetch(url, FetchOptions::from_plugins(plugins))
                .await
                .and_then(FetchResult::into_body)
                .map_err(|e| FreshetError::Scrape(format!("{url}: {e}")))?;
            content = Some(String::from_utf8_lossy(&page).into_owned());
        }

        // Content always passes through the rewriter, so sanitization applies
        // even with no plugins configured.
        if let Some(html) = content {
            let base = home_page
                .and_then(|href| Url::parse(href).ok())
                .unwrap_or_else(|| feed_url.clone());
            let options = HtmlOptions {
                scrape: plugins.scraper.as_deref(),
                remove: plugins.remove.as_deref(),
                image: plugins.rewrite_image_url.as_ref(),
                base: Some(&base),
            };
            item.content_html = Some(self.content.rewrite(&html, &options)?);
        }

        Ok(item)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable sort, oldest first, undated items last. Stability preserves the
/// source order of items sharing a date.
pub fn sort_items(items: &mut [CanonicalItem]) {
    items.sort_by_key(|item| {
        item.date_published
            .map(|date| date.timestamp_millis())
            .unwrap_or(i64::MAX)
    });
}
