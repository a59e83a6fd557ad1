pub mod command;
pub mod live;

use std::{path::Path, sync::Arc};

use anyhow::{bail, Result};
use log::warn;

use crate::{
    clock::Clock,
    models::IntervalRecord,
    settings::{BackendKind, Settings},
    storage::{JsonFileBackend, RecordBackend, SqliteBackend},
    store::RecordStore,
    timer::{TimerController, TimerStatus},
    view::{Screen, TableView},
};

pub const DATABASE_FILE: &str = "worktimer.sqlite3";

pub fn open_backend(data_dir: &Path, settings: &Settings) -> Result<Box<dyn RecordBackend>> {
    let backend: Box<dyn RecordBackend> = match settings.backend {
        BackendKind::Sqlite => Box::new(SqliteBackend::open(
            data_dir.join(DATABASE_FILE),
            &settings.storage_key,
        )?),
        BackendKind::Json => Box::new(JsonFileBackend::new(data_dir, &settings.storage_key)?),
    };
    Ok(backend)
}

/// The store, the timer and the table wired together.
///
/// The table subscribes before the timer, so after a change the live counter
/// is drawn last.
pub struct Workbench {
    store: Arc<RecordStore>,
    timer: TimerController,
    table: Arc<TableView>,
}

impl Workbench {
    pub fn new(
        backend: Box<dyn RecordBackend>,
        clock: Arc<dyn Clock>,
        screen: Arc<dyn Screen>,
        settings: &Settings,
    ) -> Self {
        let store = Arc::new(RecordStore::new(backend));
        let table = TableView::attach(&store, screen.clone(), settings.timestamp_format.clone());
        let timer = TimerController::new(store.clone(), clock, screen, settings.tick_interval());

        Self {
            store,
            timer,
            table,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn records(&self) -> Vec<IntervalRecord> {
        self.store.get_all()
    }

    pub fn toggle(&self) -> Result<TimerStatus> {
        self.timer.toggle()
    }

    pub fn start(&self) -> Result<TimerStatus> {
        self.timer.start()
    }

    pub fn stop(&self) -> Result<TimerStatus> {
        self.timer.stop()
    }

    /// Empties the store and stops the timer whatever state it was in. The
    /// timer is reset even when the store could not be written.
    pub fn clear(&self) -> Result<()> {
        let cleared = self.store.clear();
        self.timer.reset();
        cleared?;
        Ok(())
    }

    /// Deletes a completed record. The open record cannot be deleted; an index
    /// past the end is ignored.
    pub fn delete(&self, index: usize) -> Result<()> {
        match self.store.get_all().get(index) {
            Some(record) if record.is_running() => {
                bail!("record {index} is still running; stop the timer first")
            }
            Some(_) => {}
            None => warn!("No record at index {index}; nothing deleted"),
        }
        self.store.delete_at(index)?;
        Ok(())
    }

    pub fn render(&self) {
        self.table.render(&self.store.get_all());
        self.timer.refresh();
    }
}
