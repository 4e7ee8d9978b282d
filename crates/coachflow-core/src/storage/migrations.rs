//! Database schema migrations for coachflow.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version after all migrations have run.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: document tables.
///
/// Every document is stored as JSON in `doc`, with the columns needed for
/// lookups lifted out next to it.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS programs (
            id              TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            doc             TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS enrollments (
            id              TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            program_id      TEXT NOT NULL,
            doc             TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cohorts (
            id              TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            program_id      TEXT NOT NULL,
            doc             TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS program_instances (
            id              TEXT PRIMARY KEY,
            program_id      TEXT NOT NULL,
            organization_id TEXT NOT NULL,
            kind            TEXT NOT NULL,
            enrollment_id   TEXT,
            cohort_id       TEXT,
            doc             TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS client_coaching_data (
            key             TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL DEFAULT '',
            client_id       TEXT NOT NULL,
            doc             TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_programs_org ON programs(organization_id);
        CREATE INDEX IF NOT EXISTS idx_enrollments_program ON enrollments(program_id);
        CREATE INDEX IF NOT EXISTS idx_cohorts_program ON cohorts(program_id);
        CREATE INDEX IF NOT EXISTS idx_instances_program ON program_instances(program_id);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: at most one instance per enrollment and per cohort.
///
/// Duplicates written before the constraint existed are collapsed onto the
/// oldest row first.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "DELETE FROM program_instances
         WHERE enrollment_id IS NOT NULL
           AND rowid NOT IN (
               SELECT MIN(rowid) FROM program_instances
               WHERE enrollment_id IS NOT NULL
               GROUP BY program_id, enrollment_id
           );

         DELETE FROM program_instances
         WHERE cohort_id IS NOT NULL
           AND rowid NOT IN (
               SELECT MIN(rowid) FROM program_instances
               WHERE cohort_id IS NOT NULL
               GROUP BY program_id, cohort_id
           );

         CREATE UNIQUE INDEX IF NOT EXISTS idx_instances_enrollment_unique
             ON program_instances(program_id, enrollment_id)
             WHERE enrollment_id IS NOT NULL;

         CREATE UNIQUE INDEX IF NOT EXISTS idx_instances_cohort_unique
             ON program_instances(program_id, cohort_id)
             WHERE cohort_id IS NOT NULL;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
