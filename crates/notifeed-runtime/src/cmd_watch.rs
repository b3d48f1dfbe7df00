//! `notifeed watch`: follow the live feed, redrawing on every change.

use std::sync::Arc;

use chrono::Utc;
use notifeed_live::{FeedConfig, HistoryQuery, NotificationFeed, SessionSource};

use crate::cli::WatchOpts;
use crate::render::{format_feed, resolve_color};

pub async fn cmd_watch(
    config: FeedConfig,
    session: Arc<dyn SessionSource>,
    opts: &WatchOpts,
) -> anyhow::Result<()> {
    let use_color = resolve_color(&opts.color);
    let feed = NotificationFeed::new(config, session)?;
    let mut rx = feed.subscribe();

    feed.connect();
    if !opts.no_history {
        feed.fetch_history(HistoryQuery::default()).await;
    }

    loop {
        // Clear screen + cursor home
        print!("\x1b[2J\x1b[H");
        let state = rx.borrow_and_update().clone();
        println!("{}", format_feed(&state, opts.limit, Utc::now(), use_color));

        if use_color {
            println!("\n\x1b[2mnotifeed watch \u{2014} Ctrl-C to quit\x1b[0m");
        } else {
            println!("\nnotifeed watch \u{2014} Ctrl-C to quit");
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => { break; }
        }
    }

    feed.disconnect();
    feed.shutdown();
    tracing::debug!("watch: stopped");
    Ok(())
}
