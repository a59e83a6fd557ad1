use anyhow::{bail, Context, Result};
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

/// Creates the key/value table on a fresh database and refuses databases
/// written by a newer build.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    match version {
        0 => conn
            .execute_batch(include_str!("schemas/schema_v1.sql"))
            .context("failed to create the local_storage table"),
        SCHEMA_VERSION => Ok(()),
        newer => bail!("database schema version {newer} is newer than supported ({SCHEMA_VERSION})"),
    }
}
