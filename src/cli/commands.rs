//! Command implementations; thin glue between clap and the engine.

use url::Url;

use crate::app::{AppContext, FreshetError, Result};
use crate::cli::parse_interval;
use crate::domain::{Feed, FeedPatch, PluginConfig, Subscription};

fn interval(raw: Option<&str>) -> Result<Option<i64>> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_interval(raw).map_err(FreshetError::Config),
    }
}

fn feed_by_url(ctx: &AppContext, url: &str) -> Result<Feed> {
    ctx.store
        .get_feed_by_url(url)?
        .ok_or_else(|| FreshetError::Other(format!("no subscription for {url}")))
}

#[allow(clippy::too_many_arguments)]
pub async fn add_feed(
    ctx: &AppContext,
    url: &str,
    category: Option<&str>,
    refresh: Option<&str>,
    mark_read: Option<&str>,
    clean: Option<&str>,
    plugins: Option<&str>,
) -> Result<()> {
    Url::parse(url)?;

    let mut subscription = Subscription::new(url);
    if let Some(category) = category {
        subscription.category = category.to_string();
    }
    subscription.refresh_secs = interval(refresh)?;
    subscription.mark_read_secs = interval(mark_read)?;
    subscription.clean_secs = interval(clean)?;
    if let Some(plugins) = plugins {
        subscription.plugins = PluginConfig::parse(plugins)?;
    }

    let feed = ctx.store.subscribe(&subscription)?;
    println!("Subscribed to {url}");

    match ctx.scheduler.refresh(feed.id).await {
        Ok(count) => println!("Fetched {count} items"),
        Err(e) => eprintln!("Initial refresh failed: {e}"),
    }
    Ok(())
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = feed_by_url(ctx, url)?;
    ctx.store.delete_feed(feed.id)?;
    println!("Removed {} and its items", feed.display_title());
    Ok(())
}

pub fn edit_feed(
    ctx: &AppContext,
    url: &str,
    category: Option<&str>,
    refresh: Option<&str>,
    mark_read: Option<&str>,
    clean: Option<&str>,
    plugins: Option<&str>,
) -> Result<()> {
    let feed = feed_by_url(ctx, url)?;

    let patch = FeedPatch {
        url: None,
        category: category.map(String::from),
        refresh_secs: refresh
            .map(|raw| parse_interval(raw).map_err(FreshetError::Config))
            .transpose()?,
        mark_read_secs: mark_read
            .map(|raw| parse_interval(raw).map_err(FreshetError::Config))
            .transpose()?,
        clean_secs: clean
            .map(|raw| parse_interval(raw).map_err(FreshetError::Config))
            .transpose()?,
        plugins: plugins.map(|raw| serde_json::from_str(raw)).transpose()?,
    };
    ctx.store.patch_feed(feed.id, &patch)?;
    println!("Updated {}", feed.display_title());
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.list_feeds()?;
    if feeds.is_empty() {
        println!("No subscriptions");
        return Ok(());
    }
    for feed in feeds {
        let schedule = match feed.refresh_secs {
            Some(secs) => format!("every {secs}s"),
            None => "manual".to_string(),
        };
        println!(
            "[{}] {} ({}, {})",
            feed.category,
            feed.display_title(),
            feed.url,
            schedule
        );
    }
    Ok(())
}

pub fn list_items(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = feed_by_url(ctx, url)?;
    let items = ctx.store.list_items(feed.id)?;
    if items.is_empty() {
        println!("No items in {}", feed.display_title());
        return Ok(());
    }
    for item in items {
        let marker = match (item.read, item.star) {
            (_, true) => "*",
            (false, _) => "N",
            _ => " ",
        };
        let date = item
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());
        println!("{marker} {date}  {}", item.display_title());
    }
    Ok(())
}

pub async fn refresh(ctx: &AppContext, url: Option<&str>) -> Result<()> {
    match url {
        Some(url) => {
            let feed = feed_by_url(ctx, url)?;
            let count = ctx.scheduler.refresh(feed.id).await?;
            println!("{count} new items from {}", feed.display_title());
        }
        None => {
            let report = ctx.scheduler.refresh_all().await?;
            println!(
                "Refreshed {} feeds: {} new items, {} errors",
                report.feeds, report.new_items, report.errors
            );
        }
    }
    Ok(())
}

pub async fn run(ctx: &AppContext) -> Result<()> {
    ctx.scheduler.run().await;
    Ok(())
}
