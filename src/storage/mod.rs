//! Persistence backends for the record list.
//!
//! Every backend stores the whole list under a single key as a JSON array of
//! `{"Start": ms, "End": ms}` objects. Reading never repairs data: a missing
//! key is an empty list, and malformed content is reported as an error that
//! the record store turns into an empty list.

mod json_file;
mod schema;
mod sqlite;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use anyhow::{anyhow, bail, Context, Result};

use crate::models::IntervalRecord;

pub use json_file::JsonFileBackend;
pub use sqlite::SqliteBackend;

pub trait RecordBackend: Send + Sync {
    fn load(&self) -> Result<Vec<IntervalRecord>>;
    fn save(&self, records: &[IntervalRecord]) -> Result<()>;
    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;
}

impl<T: RecordBackend + ?Sized> RecordBackend for Arc<T> {
    fn load(&self) -> Result<Vec<IntervalRecord>> {
        (**self).load()
    }

    fn save(&self, records: &[IntervalRecord]) -> Result<()> {
        (**self).save(records)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

pub fn decode_records(raw: &str) -> Result<Vec<IntervalRecord>> {
    // A stored `null` reads the same as a missing key.
    let parsed: Option<Vec<IntervalRecord>> =
        serde_json::from_str(raw).context("stored record list is not valid JSON")?;
    Ok(parsed.unwrap_or_default())
}

pub fn encode_records(records: &[IntervalRecord]) -> Result<String> {
    serde_json::to_string(records).context("failed to serialize record list")
}

/// Keys end up in file names and SQL rows; keep them to a safe alphabet.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("storage key must not be empty");
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        || key.starts_with('.')
    {
        bail!("storage key '{key}' may only contain ASCII letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

/// In-process backend holding the raw serialized value, like a browser's
/// local storage slot.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    raw: Mutex<Option<String>>,
    read_only: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with an arbitrary stored value, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
            read_only: AtomicBool::new(false),
        }
    }

    /// While set, every `save` fails and the stored value is left alone.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|guard| guard.clone())
    }
}

impl RecordBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<IntervalRecord>> {
        let guard = self
            .raw
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        match guard.as_deref() {
            Some(raw) => decode_records(raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[IntervalRecord]) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            bail!("memory backend is read-only");
        }
        let encoded = encode_records(records)?;
        let mut guard = self
            .raw
            .lock()
            .map_err(|_| anyhow!("memory backend lock poisoned"))?;
        *guard = Some(encoded);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
