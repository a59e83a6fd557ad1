pub mod app;
pub mod cli;
pub mod clock;
pub mod models;
pub mod settings;
pub mod storage;
pub mod store;
pub mod timer;
pub mod view;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use cli::{Args, Command};
use settings::SettingsStore;

pub use app::Workbench;
pub use models::IntervalRecord;
pub use store::{RecordStore, StoreError, StoreObserver};
pub use timer::{TimerController, TimerStatus};

pub const DATA_DIR_ENV: &str = "WORKTIMER_DATA_DIR";
pub const SETTINGS_FILE: &str = "settings.json";

pub fn run() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG still wins over the defaults below.
    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let data_dir = resolve_data_dir(args.data_dir)?;
    log::info!("worktimer starting with data dir {}", data_dir.display());

    let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
    let command = args.command.unwrap_or(Command::Live);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(app::command::run(command, data_dir, settings));
    // Blocking work still in flight (a stdin read) must not hold up exit.
    runtime.shutdown_background();
    result
}

pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("worktimer"))
        .ok_or_else(|| anyhow!("no data directory available; pass --data-dir or set {DATA_DIR_ENV}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/somewhere"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/somewhere"));
    }
}
