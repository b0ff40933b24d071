use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshet::app::AppContext;
use freshet::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config.as_deref())?;

    match cli.command {
        Commands::Add {
            url,
            category,
            refresh,
            mark_read,
            clean,
            plugins,
        } => {
            commands::add_feed(
                &ctx,
                &url,
                category.as_deref(),
                refresh.as_deref(),
                mark_read.as_deref(),
                clean.as_deref(),
                plugins.as_deref(),
            )
            .await?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::Edit {
            url,
            category,
            refresh,
            mark_read,
            clean,
            plugins,
        } => {
            commands::edit_feed(
                &ctx,
                &url,
                category.as_deref(),
                refresh.as_deref(),
                mark_read.as_deref(),
                clean.as_deref(),
                plugins.as_deref(),
            )?;
        }
        Commands::List { items } => {
            if let Some(url) = items {
                commands::list_items(&ctx, &url)?;
            } else {
                commands::list_feeds(&ctx)?;
            }
        }
        Commands::Refresh { url } => {
            commands::refresh(&ctx, url.as_deref()).await?;
        }
        Commands::Run => {
            commands::run(&ctx).await?;
        }
    }

    Ok(())
}
