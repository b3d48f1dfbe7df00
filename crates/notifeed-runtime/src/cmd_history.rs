//! `notifeed history`: fetch one page and print it.

use std::sync::Arc;

use chrono::Utc;
use notifeed_live::{FeedConfig, HistoryFetcher, HistoryQuery, SessionSource};

use crate::cli::HistoryOpts;
use crate::render::{format_item, resolve_color};

pub fn query_from(opts: &HistoryOpts) -> HistoryQuery {
    HistoryQuery {
        page: opts.page,
        page_size: opts.page_size,
        unread_only: opts.unread_only,
    }
}

pub async fn cmd_history(
    config: &FeedConfig,
    session: Arc<dyn SessionSource>,
    opts: &HistoryOpts,
) -> anyhow::Result<()> {
    config.validate()?;
    let fetcher = HistoryFetcher::new(config, session)?;
    let items = fetcher.fetch(&query_from(opts)).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("(no notifications)");
        return Ok(());
    }
    let use_color = resolve_color("auto");
    let now = Utc::now();
    for item in &items {
        println!("{}", format_item(item, now, use_color));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_all_options() {
        let opts = HistoryOpts {
            page: 3,
            page_size: 50,
            unread_only: true,
            json: false,
        };
        assert_eq!(
            query_from(&opts),
            HistoryQuery {
                page: 3,
                page_size: 50,
                unread_only: true,
            }
        );
    }
}
