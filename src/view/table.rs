use std::sync::Arc;

use crate::{
    models::IntervalRecord,
    store::{RecordStore, StoreObserver},
};

use super::{
    format::{format_duration, format_timestamp},
    Screen, TableModel, TableRow,
};

/// History table, re-rendered in full on every store change.
pub struct TableView {
    screen: Arc<dyn Screen>,
    timestamp_format: String,
}

impl TableView {
    /// Subscribes to `store` and renders the current list once.
    pub fn attach(
        store: &RecordStore,
        screen: Arc<dyn Screen>,
        timestamp_format: impl Into<String>,
    ) -> Arc<Self> {
        let view = Arc::new(Self {
            screen,
            timestamp_format: timestamp_format.into(),
        });
        store.on_change(view.clone());
        view.render(&store.get_all());
        view
    }

    pub fn model(&self, records: &[IntervalRecord]) -> TableModel {
        let rows = records
            .iter()
            .enumerate()
            .rev()
            .map(|(index, record)| self.row(index, record))
            .collect();

        TableModel {
            rows,
            visible: !records.is_empty(),
        }
    }

    pub fn render(&self, records: &[IntervalRecord]) {
        self.screen.show_table(&self.model(records));
    }

    fn row(&self, index: usize, record: &IntervalRecord) -> TableRow {
        TableRow {
            index,
            started: format_timestamp(record.start, &self.timestamp_format),
            ended: record
                .end
                .map(|end| format_timestamp(end, &self.timestamp_format)),
            duration: record.duration_ms().map(format_duration),
            active: record.is_running(),
            deletable: !record.is_running(),
        }
    }
}

impl StoreObserver for TableView {
    fn store_changed(&self, records: &[IntervalRecord]) {
        self.render(records);
    }
}
