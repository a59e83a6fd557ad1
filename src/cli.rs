use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::settings::BackendKind;

#[derive(Parser, Debug)]
#[command(
    name = "worktimer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Start/stop work timer with a persisted history"
)]
pub struct Args {
    /// Directory holding settings and records (default: $WORKTIMER_DATA_DIR or the user data dir)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(about = "Start the timer if stopped, stop it if running")]
    Toggle,

    #[command(about = "Start the timer (does nothing if already running)")]
    Start,

    #[command(about = "Stop the running timer")]
    Stop,

    #[command(about = "Delete every record and stop the timer")]
    Clear,

    #[command(about = "Delete the completed record with the given index")]
    Delete { index: usize },

    #[command(about = "Show the history table and totals", visible_alias = "status")]
    List,

    #[command(about = "Interactive view with a ticking counter (default)")]
    Live,

    #[command(about = "Show or change settings")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    #[command(about = "Print the current settings")]
    Show,

    #[command(about = "Change one or more settings")]
    Set {
        #[arg(long)]
        tick_interval_ms: Option<u64>,

        #[arg(long, value_enum)]
        backend: Option<BackendKind>,

        #[arg(long)]
        storage_key: Option<String>,

        #[arg(long)]
        timestamp_format: Option<String>,
    },
}
