//! Everything the user sees: the history table, the live counter, and the
//! `Screen` they are drawn on.

pub mod format;
mod live;
mod table;
mod terminal;

use std::sync::Mutex;

pub use live::LiveDisplay;
pub use table::TableView;
pub use terminal::TerminalScreen;

pub const TOTAL_LABEL: &str = "Your Total Working Time";
pub const PERSISTENCE_NOTE: &str =
    "After starting the timer, it continues to run even if you close the terminal.";

/// One history row, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Position in the stored list; what a delete acts on.
    pub index: usize,
    pub started: String,
    pub ended: Option<String>,
    pub duration: Option<String>,
    pub active: bool,
    pub deletable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableModel {
    /// Newest first.
    pub rows: Vec<TableRow>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveReading {
    pub running: bool,
    pub current_ms: i64,
    pub total_ms: i64,
}

pub trait Screen: Send + Sync {
    fn show_table(&self, table: &TableModel);
    fn show_live(&self, reading: &LiveReading);
}

/// Screen that keeps every frame it is given.
#[derive(Debug, Default)]
pub struct MemoryScreen {
    tables: Mutex<Vec<TableModel>>,
    live: Mutex<Vec<LiveReading>>,
}

impl MemoryScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_table(&self) -> Option<TableModel> {
        self.tables.lock().ok()?.last().cloned()
    }

    pub fn last_live(&self) -> Option<LiveReading> {
        self.live.lock().ok()?.last().copied()
    }

    /// Every live frame drawn so far, oldest first.
    pub fn live_frames(&self) -> Vec<LiveReading> {
        self.live.lock().map(|frames| frames.clone()).unwrap_or_default()
    }

    pub fn table_count(&self) -> usize {
        self.tables.lock().map(|frames| frames.len()).unwrap_or(0)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|frames| frames.len()).unwrap_or(0)
    }
}

impl Screen for MemoryScreen {
    fn show_table(&self, table: &TableModel) {
        if let Ok(mut frames) = self.tables.lock() {
            frames.push(table.clone());
        }
    }

    fn show_live(&self, reading: &LiveReading) {
        if let Ok(mut frames) = self.live.lock() {
            frames.push(*reading);
        }
    }
}
