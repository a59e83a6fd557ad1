//! The record store: the only owner of the persisted interval list.
//!
//! Every mutation reads the full list from the backend, changes it, writes it
//! back, and then synchronously notifies observers with the new list.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, warn};
use thiserror::Error;

use crate::{models::IntervalRecord, storage::RecordBackend};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no running record to replace")]
    NoRunningRecord,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Receives the full record list after every store mutation.
pub trait StoreObserver: Send + Sync {
    fn store_changed(&self, records: &[IntervalRecord]);
}

/// Sum of `end - start` over completed records. Running records count as zero.
pub fn total_duration(records: &[IntervalRecord]) -> i64 {
    records
        .iter()
        .filter_map(IntervalRecord::duration_ms)
        .fold(0i64, i64::saturating_add)
}

pub struct RecordStore {
    backend: Box<dyn RecordBackend>,
    observers: Mutex<Vec<Arc<dyn StoreObserver>>>,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(backend: Box<dyn RecordBackend>) -> Self {
        Self {
            backend,
            observers: Mutex::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn on_change(&self, observer: Arc<dyn StoreObserver>) {
        lock(&self.observers).push(observer);
    }

    /// Current list; absent or unreadable data is an empty list.
    pub fn get_all(&self) -> Vec<IntervalRecord> {
        match self.backend.load() {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "Ignoring unreadable records in {}: {err:#}",
                    self.backend.describe()
                );
                Vec::new()
            }
        }
    }

    pub fn last(&self) -> Option<IntervalRecord> {
        self.get_all().last().copied()
    }

    pub fn total_duration(&self) -> i64 {
        total_duration(&self.get_all())
    }

    pub fn append(&self, record: IntervalRecord) -> Result<(), StoreError> {
        self.mutate(|records| {
            records.push(record);
            Ok(())
        })
    }

    pub fn replace_last(&self, record: IntervalRecord) -> Result<(), StoreError> {
        self.mutate(|records| match records.last_mut() {
            Some(last) => {
                *last = record;
                Ok(())
            }
            None => Err(StoreError::NoRunningRecord),
        })
    }

    /// Removes the record at `index`. An index past the end changes nothing.
    pub fn delete_at(&self, index: usize) -> Result<(), StoreError> {
        self.mutate(|records| {
            if index < records.len() {
                records.remove(index);
            }
            Ok(())
        })
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|records| {
            records.clear();
            Ok(())
        })
    }

    fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<IntervalRecord>) -> Result<(), StoreError>,
    {
        let records = {
            let _guard = lock(&self.write_lock);
            let mut records = self.get_all();
            change(&mut records)?;
            if let Err(err) = self.backend.save(&records) {
                error!(
                    "Failed to persist records to {}: {err:#}",
                    self.backend.describe()
                );
                return Err(StoreError::Backend(err));
            }
            records
        };

        self.notify(&records);
        Ok(())
    }

    fn notify(&self, records: &[IntervalRecord]) {
        let observers: Vec<_> = lock(&self.observers).clone();
        for observer in observers {
            observer.store_changed(records);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[derive(Default)]
    struct CountingObserver {
        seen: Mutex<Vec<Vec<IntervalRecord>>>,
    }

    impl StoreObserver for CountingObserver {
        fn store_changed(&self, records: &[IntervalRecord]) {
            self.seen.lock().unwrap().push(records.to_vec());
        }
    }

    fn completed(start: i64, end: i64) -> IntervalRecord {
        IntervalRecord {
            start,
            end: Some(end),
        }
    }

    fn store_with_observer() -> (RecordStore, Arc<CountingObserver>) {
        let store = RecordStore::new(Box::new(MemoryBackend::new()));
        let observer = Arc::new(CountingObserver::default());
        store.on_change(observer.clone());
        (store, observer)
    }

    #[test]
    fn empty_store_reads_as_empty() {
        let (store, _) = store_with_observer();
        assert!(store.get_all().is_empty());
        assert_eq!(store.last(), None);
        assert_eq!(store.total_duration(), 0);
    }

    #[test]
    fn malformed_data_fails_open() {
        let store = RecordStore::new(Box::new(MemoryBackend::with_raw("{{{")));
        assert!(store.get_all().is_empty());

        store.append(IntervalRecord::started_at(10)).unwrap();
        assert_eq!(store.get_all(), vec![IntervalRecord::started_at(10)]);
    }

    #[test]
    fn every_mutation_notifies_with_the_full_list() {
        let (store, observer) = store_with_observer();

        store.append(completed(0, 1000)).unwrap();
        store.append(IntervalRecord::started_at(2000)).unwrap();
        store.replace_last(completed(2000, 2500)).unwrap();
        store.delete_at(0).unwrap();
        store.clear().unwrap();

        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[2], vec![completed(0, 1000), completed(2000, 2500)]);
        assert_eq!(seen[3], vec![completed(2000, 2500)]);
        assert!(seen[4].is_empty());
    }

    #[test]
    fn replace_last_on_empty_store_is_rejected() {
        let (store, observer) = store_with_observer();

        let err = store.replace_last(completed(0, 1)).unwrap_err();
        assert!(matches!(err, StoreError::NoRunningRecord));
        assert!(store.get_all().is_empty());
        assert!(observer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn delete_removes_only_the_indexed_record() {
        let (store, _) = store_with_observer();
        store.append(completed(0, 1000)).unwrap();
        store.append(completed(2000, 2500)).unwrap();

        store.delete_at(0).unwrap();

        assert_eq!(store.get_all(), vec![completed(2000, 2500)]);
        assert_eq!(store.total_duration(), 500);
    }

    #[test]
    fn out_of_range_delete_is_a_no_op() {
        let (store, _) = store_with_observer();
        store.append(completed(0, 1000)).unwrap();

        store.delete_at(7).unwrap();

        assert_eq!(store.get_all(), vec![completed(0, 1000)]);
    }

    #[test]
    fn extreme_stored_values_do_not_overflow_the_total() {
        let store = RecordStore::new(Box::new(MemoryBackend::with_raw(
            r#"[{"Start":-9223372036854775808,"End":9223372036854775807},{"Start":0,"End":10}]"#,
        )));

        assert_eq!(store.get_all().len(), 2);
        assert_eq!(store.total_duration(), i64::MAX);
    }

    #[test]
    fn running_record_does_not_count_towards_total() {
        let records = [
            completed(0, 1000),
            completed(2000, 2500),
            IntervalRecord::started_at(3000),
        ];
        assert_eq!(total_duration(&records), 1500);
    }
}
