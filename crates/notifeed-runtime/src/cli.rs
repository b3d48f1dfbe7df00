//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notifeed", about = "Live referral notification feed")]
pub struct Cli {
    /// TOML config file (defaults are used when omitted)
    #[arg(long, short = 'c', global = true, env = "NOTIFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// History endpoint base URL, overrides the config file
    #[arg(long, global = true, env = "NOTIFEED_API_BASE")]
    pub api_base: Option<String>,

    /// Live channel base URL, overrides the config file
    #[arg(long, global = true, env = "NOTIFEED_WS_BASE")]
    pub ws_base: Option<String>,

    /// Bearer token
    #[arg(long, global = true, env = "NOTIFEED_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Numeric user id addressing the live channel
    #[arg(long, global = true, env = "NOTIFEED_USER_ID")]
    pub user_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow the live feed until Ctrl-C (default)
    Watch(WatchOpts),
    /// Fetch one page of history and print it
    History(HistoryOpts),
}

#[derive(clap::Args)]
pub struct WatchOpts {
    /// Items shown per refresh
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Skip the initial history fetch
    #[arg(long)]
    pub no_history: bool,

    /// Color output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,
}

impl Default for WatchOpts {
    fn default() -> Self {
        Self {
            limit: 20,
            no_history: false,
            color: "auto".to_string(),
        }
    }
}

#[derive(clap::Args)]
pub struct HistoryOpts {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 20)]
    pub page_size: u32,

    /// Only unread notifications
    #[arg(long)]
    pub unread_only: bool,

    /// Print items as JSON
    #[arg(long)]
    pub json: bool,
}
