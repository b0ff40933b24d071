//! Command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "freshet", about = "Feed aggregation and refresh engine", version)]
pub struct Cli {
    /// Path to a configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to a feed
    Add {
        url: String,
        /// Category to file the feed under
        #[arg(long)]
        category: Option<String>,
        /// Refresh interval, e.g. "15m", "1h", "3600"
        #[arg(long)]
        refresh: Option<String>,
        /// Mark items read after this age, e.g. "3d"
        #[arg(long)]
        mark_read: Option<String>,
        /// Delete read items after this age, e.g. "30d"
        #[arg(long)]
        clean: Option<String>,
        /// Transform pipeline configuration as JSON
        #[arg(long)]
        plugins: Option<String>,
    },
    /// Unsubscribe from a feed
    Remove { url: String },
    /// Edit a subscription; omitted options stay unchanged
    Edit {
        url: String,
        #[arg(long)]
        category: Option<String>,
        /// New refresh interval; "never" disables scheduled refreshes
        #[arg(long)]
        refresh: Option<String>,
        #[arg(long)]
        mark_read: Option<String>,
        #[arg(long)]
        clean: Option<String>,
        /// JSON merge-patch applied to the stored plugin configuration
        #[arg(long)]
        plugins: Option<String>,
    },
    /// List subscriptions, or one feed's items
    List {
        /// Show the items of the feed with this URL
        #[arg(long)]
        items: Option<String>,
    },
    /// Refresh one feed, or all feeds
    Refresh {
        /// Feed URL; refreshes everything when omitted
        url: Option<String>,
    },
    /// Run the background scheduler in the foreground
    Run,
}

/// Parse an interval like "90s", "15m", "6h", "3d", or raw seconds.
/// "never" and "0" both mean disabled.
pub fn parse_interval(s: &str) -> Result<Option<i64>, String> {
    let s = s.trim().to_lowercase();
    if s == "never" || s == "0" {
        return Ok(None);
    }

    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => s.split_at(pos),
        None => (s.as_str(), ""),
    };
    let value: i64 = digits
        .parse()
        .map_err(|_| format!("invalid interval: {s:?}"))?;
    let secs = match unit {
        "" | "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86400,
        _ => return Err(format!("invalid interval: {s:?}. Use e.g. '15m', '1h', '3d'")),
    };
    if secs <= 0 {
        return Ok(None);
    }
    Ok(Some(secs))
}
