//! SQLite-backed document store for programs, enrollments, cohorts,
//! instances and client coaching data.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::data_dir;
use super::migrations;
use crate::coaching::ClientCoachingData;
use crate::error::{DatabaseError, Result};
use crate::instance::ProgramInstance;
use crate::program::{Program, ProgramCohort, ProgramEnrollment};

/// Result of [`ProgramDb::insert_instance_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The given instance was written.
    Created(String),
    /// An instance already existed for the same key; carries its id.
    Existing(String),
}

impl InsertOutcome {
    pub fn into_id(self) -> String {
        match self {
            InsertOutcome::Created(id) | InsertOutcome::Existing(id) => id,
        }
    }
}

/// Id and owning organization of a stored instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub id: String,
    pub organization_id: String,
}

/// Lightweight listing row for instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    pub id: String,
    pub program_id: String,
    pub kind: String,
    pub enrollment_id: Option<String>,
    pub cohort_id: Option<String>,
    pub created_at: String,
}

fn to_doc<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_doc<T: DeserializeOwned>(doc: &str) -> Result<T> {
    Ok(serde_json::from_str(doc)?)
}

/// SQLite document store.
pub struct ProgramDb {
    conn: Connection,
}

impl ProgramDb {
    /// Open the database at `<data_dir>/coachflow.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("coachflow.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    fn query_doc<T: DeserializeOwned>(&self, sql: &str, key: &str) -> Result<Option<T>> {
        let doc: Option<String> = self
            .conn
            .query_row(sql, params![key], |row| row.get(0))
            .optional()?;
        doc.as_deref().map(from_doc).transpose()
    }

    // === Programs ===

    pub fn put_program(&self, program: &Program) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO programs (id, organization_id, doc, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                program.id,
                program.organization_id,
                to_doc(program)?,
                program.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_program(&self, id: &str) -> Result<Option<Program>> {
        self.query_doc("SELECT doc FROM programs WHERE id = ?1", id)
    }

    pub fn list_programs(&self, organization_id: &str) -> Result<Vec<Program>> {
        let mut stmt = self.conn.prepare(
            "SELECT doc FROM programs WHERE organization_id = ?1 ORDER BY created_at ASC",
        )?;
        let docs = stmt
            .query_map(params![organization_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        docs.iter().map(|doc| from_doc(doc)).collect()
    }

    // === Enrollments and cohorts ===

    pub fn put_enrollment(&self, enrollment: &ProgramEnrollment) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO enrollments (id, organization_id, program_id, doc, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                enrollment.id,
                enrollment.organization_id,
                enrollment.program_id,
                to_doc(enrollment)?,
                enrollment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_enrollment(&self, id: &str) -> Result<Option<ProgramEnrollment>> {
        self.query_doc("SELECT doc FROM enrollments WHERE id = ?1", id)
    }

    pub fn put_cohort(&self, cohort: &ProgramCohort) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cohorts (id, organization_id, program_id, doc, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                cohort.id,
                cohort.organization_id,
                cohort.program_id,
                to_doc(cohort)?,
                cohort.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_cohort(&self, id: &str) -> Result<Option<ProgramCohort>> {
        self.query_doc("SELECT doc FROM cohorts WHERE id = ?1", id)
    }

    // === Instances ===

    fn query_instance_ref(&self, sql: &str, program_id: &str, key: &str) -> Result<Option<InstanceRef>> {
        Ok(self
            .conn
            .query_row(sql, params![program_id, key], |row| {
                Ok(InstanceRef {
                    id: row.get(0)?,
                    organization_id: row.get(1)?,
                })
            })
            .optional()?)
    }

    pub fn find_instance_for_enrollment(&self, program_id: &str, enrollment_id: &str) -> Result<Option<InstanceRef>> {
        self.query_instance_ref(
            "SELECT id, organization_id FROM program_instances WHERE program_id = ?1 AND enrollment_id = ?2",
            program_id,
            enrollment_id,
        )
    }

    pub fn find_instance_for_cohort(&self, program_id: &str, cohort_id: &str) -> Result<Option<InstanceRef>> {
        self.query_instance_ref(
            "SELECT id, organization_id FROM program_instances WHERE program_id = ?1 AND cohort_id = ?2",
            program_id,
            cohort_id,
        )
    }

    pub fn get_instance(&self, id: &str) -> Result<Option<ProgramInstance>> {
        self.query_doc("SELECT doc FROM program_instances WHERE id = ?1", id)
    }

    pub fn list_instances(&self, program_id: &str) -> Result<Vec<InstanceSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, program_id, kind, enrollment_id, cohort_id, created_at
             FROM program_instances WHERE program_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![program_id], |row| {
                Ok(InstanceSummary {
                    id: row.get(0)?,
                    program_id: row.get(1)?,
                    kind: row.get(2)?,
                    enrollment_id: row.get(3)?,
                    cohort_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Write `instance` unless one already exists for its
    /// (program, enrollment) or (program, cohort) key.
    ///
    /// The check and the write share one transaction, and the unique indexes
    /// reject a second row even if another connection raced past the check.
    pub fn insert_instance_if_absent(&self, instance: &ProgramInstance) -> Result<InsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "INSERT OR IGNORE INTO program_instances
                (id, program_id, organization_id, kind, enrollment_id, cohort_id, doc, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                instance.id,
                instance.program_id,
                instance.organization_id,
                instance.kind.label(),
                instance.kind.enrollment_id(),
                instance.kind.cohort_id(),
                to_doc(instance)?,
                instance.created_at.to_rfc3339(),
            ],
        )?;

        if changed == 1 {
            tx.commit()?;
            return Ok(InsertOutcome::Created(instance.id.clone()));
        }

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM program_instances
                 WHERE program_id = ?1
                   AND (enrollment_id IS ?2 AND ?2 IS NOT NULL
                        OR cohort_id IS ?3 AND ?3 IS NOT NULL
                        OR id = ?4)",
                params![
                    instance.program_id,
                    instance.kind.enrollment_id(),
                    instance.kind.cohort_id(),
                    instance.id,
                ],
                |row| row.get(0),
            )
            .optional()?;
        tx.commit()?;

        match existing {
            Some(id) => Ok(InsertOutcome::Existing(id)),
            None => Err(DatabaseError::Constraint(format!(
                "instance {} was ignored but no conflicting row was found",
                instance.id
            ))
            .into()),
        }
    }

    // === Client coaching data ===

    pub fn get_coaching_doc(&self, key: &str) -> Result<Option<ClientCoachingData>> {
        self.query_doc("SELECT doc FROM client_coaching_data WHERE key = ?1", key)
    }

    pub fn put_coaching_doc(&self, key: &str, data: &ClientCoachingData) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO client_coaching_data (key, organization_id, client_id, doc, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                data.organization_id,
                data.client_id,
                to_doc(data)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_coaching_doc(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM client_coaching_data WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }
}
