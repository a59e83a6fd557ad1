use std::{
    path::PathBuf,
    sync::{mpsc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::{decode_records, encode_records, schema::ensure_schema, validate_key, RecordBackend};
use crate::models::IntervalRecord;

type Job = Box<dyn FnOnce(&Connection) + Send + 'static>;

/// Owns the connection on its own thread. Dropping the sender ends the
/// thread's receive loop; `Drop` then waits for it.
struct ConnectionThread {
    jobs: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionThread {
    fn spawn(conn: Connection) -> Result<Self> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("worktimer-db".into())
            .spawn(move || {
                for job in jobs_rx {
                    job(&conn);
                }
                debug!("Record database thread finished");
            })
            .context("failed to spawn database thread")?;

        Ok(Self {
            jobs: Mutex::new(Some(jobs_tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move |conn| {
            let _ = reply_tx.send(job(conn));
        });

        let jobs = self
            .jobs
            .lock()
            .map_err(|_| anyhow!("database job queue lock poisoned"))?;
        jobs.as_ref()
            .ok_or_else(|| anyhow!("database thread already stopped"))?
            .send(job)
            .map_err(|_| anyhow!("database thread is gone"))?;
        drop(jobs);

        reply_rx
            .recv()
            .map_err(|_| anyhow!("database thread dropped the request"))?
    }
}

impl Drop for ConnectionThread {
    fn drop(&mut self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.take();
        }
        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Record database thread panicked");
            }
        }
    }
}

/// One row of a `local_storage(key, value)` table holds the record list.
pub struct SqliteBackend {
    thread: ConnectionThread,
    db_path: PathBuf,
    key: String,
}

impl SqliteBackend {
    pub fn open(db_path: PathBuf, key: &str) -> Result<Self> {
        validate_key(key)?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }
        ensure_schema(&conn)?;

        info!(
            "Record database ready at {} (key '{key}')",
            db_path.display()
        );

        Ok(Self {
            thread: ConnectionThread::spawn(conn)?,
            db_path,
            key: key.to_string(),
        })
    }

    fn read_raw(&self) -> Result<Option<String>> {
        let key = self.key.clone();
        self.thread.run(move |conn| {
            conn.query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("failed to read stored records")
        })
    }

    fn write_raw(&self, value: String) -> Result<()> {
        let key = self.key.clone();
        self.thread.run(move |conn| {
            conn.execute(
                "INSERT INTO local_storage (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .context("failed to write stored records")?;
            Ok(())
        })
    }
}

impl RecordBackend for SqliteBackend {
    fn load(&self) -> Result<Vec<IntervalRecord>> {
        match self.read_raw()? {
            Some(raw) => decode_records(&raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[IntervalRecord]) -> Result<()> {
        self.write_raw(encode_records(records)?)
    }

    fn describe(&self) -> String {
        format!("{}#{}", self.db_path.display(), self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir, key: &str) -> SqliteBackend {
        SqliteBackend::open(dir.path().join("worktimer.sqlite3"), key).unwrap()
    }

    #[test]
    fn unknown_key_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        assert!(open(&dir, "list").load().unwrap().is_empty());
    }

    #[test]
    fn records_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            IntervalRecord { start: 0, end: Some(1000) },
            IntervalRecord { start: 2000, end: Some(2500) },
            IntervalRecord::started_at(3000),
        ];

        {
            let backend = open(&dir, "list");
            backend.save(&records).unwrap();
            backend.save(&records).unwrap();
        }

        let reopened = open(&dir, "list");
        assert_eq!(reopened.load().unwrap(), records);
        assert!(open(&dir, "other").load().unwrap().is_empty());
    }

    #[test]
    fn malformed_value_is_an_error() {
        let dir = TempDir::new().unwrap();
        let backend = open(&dir, "list");
        backend.write_raw("[{\"Start\":".into()).unwrap();
        assert!(backend.load().is_err());
    }
}
