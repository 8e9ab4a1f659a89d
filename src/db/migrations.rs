//! Schema upgrades for the document table, tracked in SQLite's `user_version`.

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Transaction};

/// Schema files in upgrade order; step `n` brings the database to version `n + 1`.
const SCHEMA_STEPS: [(&str, &str); 1] = [("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

fn target_version() -> i32 {
    SCHEMA_STEPS.len() as i32
}

pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

/// Applies every missing step in one transaction and returns the resulting
/// version. A database written by a newer build is refused.
pub fn upgrade_schema(conn: &mut Connection) -> Result<i32> {
    let found = schema_version(conn)?;
    let target = target_version();
    if found > target {
        bail!("advisor database is at schema {found}, this build supports up to {target}");
    }
    if found == target {
        return Ok(found);
    }

    let tx = conn
        .transaction()
        .context("failed to open schema upgrade transaction")?;
    for (file, sql) in SCHEMA_STEPS.iter().skip(found.max(0) as usize) {
        apply_step(&tx, file, sql)?;
    }
    tx.pragma_update(None, "user_version", target)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit schema upgrade")?;

    Ok(target)
}

fn apply_step(tx: &Transaction<'_>, file: &str, sql: &str) -> Result<()> {
    tx.execute_batch(sql)
        .with_context(|| format!("failed to execute {file}"))
}
