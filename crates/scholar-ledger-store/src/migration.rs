//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()?],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Directory: singleton owner row
        CREATE TABLE directory_owner (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            owner BLOB NOT NULL               -- 20 bytes
        );

        -- Directory: institution membership
        CREATE TABLE institutions (
            address BLOB PRIMARY KEY          -- 20 bytes
        );

        -- Records: append-only
        CREATE TABLE records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,   -- registration order
            record_id BLOB NOT NULL UNIQUE,          -- 32 bytes
            student_address BLOB NOT NULL,           -- 20 bytes
            institution_address BLOB NOT NULL,       -- 20 bytes
            encrypted_data BLOB NOT NULL,
            encrypted_key_institution BLOB NOT NULL,
            encrypted_key_student BLOB NOT NULL,
            signature_institution BLOB NOT NULL,
            timestamp INTEGER NOT NULL               -- Unix ms, registry-assigned
        );

        -- Visitor access keys
        CREATE TABLE visitor_keys (
            record_id BLOB NOT NULL,
            visitor_address BLOB NOT NULL,
            encrypted_key BLOB NOT NULL,
            PRIMARY KEY (record_id, visitor_address)
        );

        CREATE INDEX idx_records_student ON records(student_address, seq);
        CREATE INDEX idx_records_institution ON records(institution_address, seq);
        "#,
    )?;

    Ok(())
}

/// Migration v2: lookup of grants by visitor.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE INDEX idx_visitor_keys_visitor ON visitor_keys(visitor_address);",
    )?;
    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> Result<i64> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| StoreError::Migration(format!("system clock before epoch: {}", e)))?;
    Ok(elapsed.as_millis() as i64)
}
