//! notifeed: terminal client for the live referral notification feed.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use notifeed_live::{FeedConfig, SessionSource, StaticSession};

mod cli;
mod cmd_history;
mod cmd_watch;
mod render;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("NOTIFEED_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let session = StaticSession::empty();
    session.set_token(args.token.clone());
    session.set_user_id(args.user_id.clone());
    let session: Arc<dyn SessionSource> = Arc::new(session);

    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Watch(cli::WatchOpts::default()));

    match command {
        cli::Command::Watch(opts) => {
            tracing::info!(ws_base = %config.ws_base, "notifeed watch starting");
            cmd_watch::cmd_watch(config, session, &opts).await?;
        }
        cli::Command::History(opts) => {
            cmd_history::cmd_history(&config, session, &opts).await?;
        }
    }

    Ok(())
}

/// Config file (or defaults), then base-URL overrides from flags/env.
fn load_config(args: &cli::Cli) -> anyhow::Result<FeedConfig> {
    let mut config = match &args.config {
        Some(path) => FeedConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FeedConfig::default(),
    };
    if let Some(api_base) = &args.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(ws_base) = &args.ws_base {
        config.ws_base = ws_base.clone();
    }
    Ok(config)
}
