use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{Command, ConfigAction},
    clock::SystemClock,
    settings::SettingsStore,
    view::TerminalScreen,
};

use super::{
    live::{ctrl_c, print_banner, run_interactive, spawn_stdin_reader},
    open_backend, Workbench,
};

/// Commands that open the store, act once and print the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OneShot {
    Toggle,
    Start,
    Stop,
    Clear,
    Delete(usize),
    List,
}

pub async fn run(command: Command, data_dir: PathBuf, settings: SettingsStore) -> Result<()> {
    let one_shot = match command {
        Command::Config { action } => return run_config(action, &settings),
        Command::Live => return run_live(&data_dir, &settings).await,
        Command::Toggle => OneShot::Toggle,
        Command::Start => OneShot::Start,
        Command::Stop => OneShot::Stop,
        Command::Clear => OneShot::Clear,
        Command::Delete { index } => OneShot::Delete(index),
        Command::List => OneShot::List,
    };
    run_once(one_shot, &data_dir, &settings)
}

async fn run_live(data_dir: &Path, settings: &SettingsStore) -> Result<()> {
    let current = settings.current();
    let backend = open_backend(data_dir, &current)?;
    print_banner();
    let screen = Arc::new(TerminalScreen::inline());
    let workbench = Workbench::new(backend, Arc::new(SystemClock), screen, &current);
    let input = spawn_stdin_reader()?;
    run_interactive(&workbench, input, ctrl_c()).await
}

fn run_once(command: OneShot, data_dir: &Path, settings: &SettingsStore) -> Result<()> {
    let current = settings.current();
    let backend = open_backend(data_dir, &current)?;
    let screen = Arc::new(TerminalScreen::deferred());
    let workbench = Workbench::new(backend, Arc::new(SystemClock), screen.clone(), &current);

    match command {
        OneShot::Toggle => {
            let status = workbench.toggle()?;
            info!(
                "Timer is now {}",
                if status.is_running() { "running" } else { "stopped" }
            );
        }
        OneShot::Start => {
            workbench.start()?;
        }
        OneShot::Stop => {
            workbench.stop()?;
        }
        OneShot::Clear => workbench.clear()?,
        OneShot::Delete(index) => workbench.delete(index)?,
        OneShot::List => workbench.render(),
    }

    // The record stays open after a one-shot start; only the ticker goes away.
    workbench.timer().release();
    screen.present().context("failed to write to stdout")
}

fn run_config(action: ConfigAction, settings: &SettingsStore) -> Result<()> {
    let current = match action {
        ConfigAction::Show => settings.current(),
        ConfigAction::Set {
            tick_interval_ms,
            backend,
            storage_key,
            timestamp_format,
        } => settings.update(|next| {
            if let Some(value) = tick_interval_ms {
                next.tick_interval_ms = value;
            }
            if let Some(value) = backend {
                next.backend = value;
            }
            if let Some(value) = storage_key {
                next.storage_key = value;
            }
            if let Some(value) = timestamp_format {
                next.timestamp_format = value;
            }
        })?,
    };

    println!("# {}", settings.path().display());
    println!("{}", serde_json::to_string_pretty(&current)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{models::IntervalRecord, storage::RecordBackend};

    fn stored(dir: &TempDir, settings: &SettingsStore) -> Vec<IntervalRecord> {
        open_backend(dir.path(), &settings.current())
            .unwrap()
            .load()
            .unwrap()
    }

    #[test]
    fn one_shot_commands_act_on_the_persisted_list() {
        let dir = TempDir::new().unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        run_once(OneShot::Start, dir.path(), &settings).unwrap();
        let records = stored(&dir, &settings);
        assert_eq!(records.len(), 1);
        assert!(records[0].is_running());

        run_once(OneShot::List, dir.path(), &settings).unwrap();
        assert_eq!(stored(&dir, &settings), records);

        run_once(OneShot::Stop, dir.path(), &settings).unwrap();
        let records = stored(&dir, &settings);
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_running());

        run_once(OneShot::Delete(0), dir.path(), &settings).unwrap();
        assert!(stored(&dir, &settings).is_empty());
    }

    #[tokio::test]
    async fn list_command_routes_to_a_one_shot_run() {
        let dir = TempDir::new().unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        run(Command::List, dir.path().to_path_buf(), settings)
            .await
            .unwrap();
    }
}
