//! Idempotent "create if absent" guards for program instances.
//!
//! The `ensure_*` functions return `None` whenever an instance could not be
//! guaranteed; callers proceed without instance data in that case. The
//! `try_ensure_*` forms expose the reason.

use chrono::NaiveDate;
use thiserror::Error;

use crate::builder::build_program_instance;
use crate::context::RequestContext;
use crate::error::{CoreError, ValidationError};
use crate::instance::InstanceKind;
use crate::program::Program;
use crate::storage::{InsertOutcome, InstanceRef, ProgramDb};

#[derive(Error, Debug)]
pub enum EnsureError {
    #[error("program '{0}' not found")]
    ProgramNotFound(String),

    #[error("enrollment '{0}' not found")]
    EnrollmentNotFound(String),

    #[error("cohort '{0}' not found")]
    CohortNotFound(String),

    /// The enrollment or cohort points at a different program.
    #[error("{kind} '{id}' belongs to program '{actual}', not '{expected}'")]
    ProgramMismatch {
        kind: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("{kind} '{id}' is not owned by organization '{organization_id}'")]
    OrganizationMismatch {
        kind: &'static str,
        id: String,
        organization_id: String,
    },

    #[error("program '{program_id}' is invalid: {source}")]
    InvalidProgram {
        program_id: String,
        #[source]
        source: ValidationError,
    },

    /// The instance would extend past the last representable date.
    #[error("program '{program_id}' cannot start on {start_date}: dates out of range")]
    StartDateOutOfRange {
        program_id: String,
        start_date: NaiveDate,
    },

    #[error("storage error: {0}")]
    Storage(#[from] CoreError),
}

fn load_program(db: &ProgramDb, ctx: &RequestContext, program_id: &str) -> Result<Program, EnsureError> {
    let program = db
        .get_program(program_id)?
        .ok_or_else(|| EnsureError::ProgramNotFound(program_id.to_string()))?;
    if !ctx.owns(&program.organization_id) {
        return Err(EnsureError::OrganizationMismatch {
            kind: "program",
            id: program.id,
            organization_id: ctx.organization_id.clone(),
        });
    }
    program.validate().map_err(|source| EnsureError::InvalidProgram {
        program_id: program.id.clone(),
        source,
    })?;
    Ok(program)
}

fn owned_instance(ctx: &RequestContext, found: InstanceRef) -> Result<String, EnsureError> {
    if !ctx.owns(&found.organization_id) {
        return Err(EnsureError::OrganizationMismatch {
            kind: "instance",
            id: found.id,
            organization_id: ctx.organization_id.clone(),
        });
    }
    Ok(found.id)
}

fn build_and_insert(
    db: &ProgramDb,
    program: &Program,
    kind: InstanceKind,
    start_date: NaiveDate,
) -> Result<String, EnsureError> {
    let instance = build_program_instance(program, kind.clone(), start_date).ok_or_else(|| {
        EnsureError::StartDateOutOfRange {
            program_id: program.id.clone(),
            start_date,
        }
    })?;
    let outcome = db.insert_instance_if_absent(&instance)?;
    log_outcome(&outcome, &program.id, &kind);
    Ok(outcome.into_id())
}

fn check_owner(
    ctx: &RequestContext,
    program_id: &str,
    kind: &'static str,
    id: &str,
    doc_program_id: &str,
    doc_organization_id: &str,
) -> Result<(), EnsureError> {
    if doc_program_id != program_id {
        return Err(EnsureError::ProgramMismatch {
            kind,
            id: id.to_string(),
            expected: program_id.to_string(),
            actual: doc_program_id.to_string(),
        });
    }
    if !ctx.owns(doc_organization_id) {
        return Err(EnsureError::OrganizationMismatch {
            kind,
            id: id.to_string(),
            organization_id: ctx.organization_id.clone(),
        });
    }
    Ok(())
}

fn log_outcome(outcome: &InsertOutcome, program_id: &str, kind: &InstanceKind) {
    match outcome {
        InsertOutcome::Created(id) => tracing::info!(
            instance_id = %id,
            program_id,
            kind = kind.label(),
            "created program instance"
        ),
        InsertOutcome::Existing(id) => tracing::debug!(
            instance_id = %id,
            program_id,
            kind = kind.label(),
            "instance written concurrently, reusing it"
        ),
    }
}

/// Return the instance id for an enrollment, creating the instance if needed.
pub fn try_ensure_enrollment_instance_exists(
    db: &ProgramDb,
    ctx: &RequestContext,
    program_id: &str,
    enrollment_id: &str,
) -> Result<String, EnsureError> {
    if let Some(found) = db.find_instance_for_enrollment(program_id, enrollment_id)? {
        return owned_instance(ctx, found);
    }

    let program = load_program(db, ctx, program_id)?;
    let enrollment = db
        .get_enrollment(enrollment_id)?
        .ok_or_else(|| EnsureError::EnrollmentNotFound(enrollment_id.to_string()))?;
    check_owner(
        ctx,
        program_id,
        "enrollment",
        enrollment_id,
        &enrollment.program_id,
        &enrollment.organization_id,
    )?;

    let kind = InstanceKind::Individual {
        enrollment_id: enrollment.id.clone(),
    };
    build_and_insert(db, &program, kind, enrollment.effective_start_date())
}

/// Return the instance id for a cohort, creating the instance if needed.
pub fn try_ensure_cohort_instance_exists(
    db: &ProgramDb,
    ctx: &RequestContext,
    program_id: &str,
    cohort_id: &str,
) -> Result<String, EnsureError> {
    if let Some(found) = db.find_instance_for_cohort(program_id, cohort_id)? {
        return owned_instance(ctx, found);
    }

    let program = load_program(db, ctx, program_id)?;
    let cohort = db
        .get_cohort(cohort_id)?
        .ok_or_else(|| EnsureError::CohortNotFound(cohort_id.to_string()))?;
    check_owner(
        ctx,
        program_id,
        "cohort",
        cohort_id,
        &cohort.program_id,
        &cohort.organization_id,
    )?;

    let kind = InstanceKind::Cohort {
        cohort_id: cohort.id.clone(),
    };
    build_and_insert(db, &program, kind, cohort.effective_start_date())
}

fn fail_closed(result: Result<String, EnsureError>, program_id: &str, key: &str) -> Option<String> {
    match result {
        Ok(id) => Some(id),
        Err(EnsureError::Storage(e)) => {
            tracing::error!(program_id, key, error = %e, "could not ensure program instance");
            None
        }
        Err(e) => {
            tracing::warn!(program_id, key, error = %e, "could not ensure program instance");
            None
        }
    }
}

/// Like [`try_ensure_enrollment_instance_exists`], logging and returning
/// `None` on any failure.
pub fn ensure_enrollment_instance_exists(
    db: &ProgramDb,
    ctx: &RequestContext,
    program_id: &str,
    enrollment_id: &str,
) -> Option<String> {
    fail_closed(
        try_ensure_enrollment_instance_exists(db, ctx, program_id, enrollment_id),
        program_id,
        enrollment_id,
    )
}

/// Like [`try_ensure_cohort_instance_exists`], logging and returning `None`
/// on any failure.
pub fn ensure_cohort_instance_exists(
    db: &ProgramDb,
    ctx: &RequestContext,
    program_id: &str,
    cohort_id: &str,
) -> Option<String> {
    fail_closed(
        try_ensure_cohort_instance_exists(db, ctx, program_id, cohort_id),
        program_id,
        cohort_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{ProgramCohort, ProgramEnrollment};
    use chrono::Duration;

    fn setup() -> (ProgramDb, Program) {
        let db = ProgramDb::open_memory().unwrap();
        let program = Program::new("org-1", "Reset", 14);
        db.put_program(&program).unwrap();
        (db, program)
    }

    #[test]
    fn enrollment_guard_is_idempotent() {
        let (db, program) = setup();
        let enrollment = ProgramEnrollment::new(&program, "user-1", None);
        db.put_enrollment(&enrollment).unwrap();
        let ctx = RequestContext::new("org-1");

        let first = ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id).unwrap();
        let second = ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(db.list_instances(&program.id).unwrap().len(), 1);
    }

    #[test]
    fn cohort_guard_uses_cohort_start_date() {
        let (db, program) = setup();
        let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let cohort = ProgramCohort::new(&program, "September", start);
        db.put_cohort(&cohort).unwrap();
        let ctx = RequestContext::new("org-1");

        let id = ensure_cohort_instance_exists(&db, &ctx, &program.id, &cohort.id).unwrap();
        let instance = db.get_instance(&id).unwrap().unwrap();
        assert_eq!(instance.start_date, start);
        assert_eq!(instance.kind.cohort_id(), Some(cohort.id.as_str()));
    }

    #[test]
    fn foreign_organization_fails_closed() {
        let (db, program) = setup();
        let enrollment = ProgramEnrollment::new(&program, "user-1", None);
        db.put_enrollment(&enrollment).unwrap();
        let ctx = RequestContext::new("org-2");

        assert!(ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id).is_none());
        assert!(matches!(
            try_ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id),
            Err(EnsureError::OrganizationMismatch { kind: "program", .. })
        ));
        assert!(db.list_instances(&program.id).unwrap().is_empty());
    }

    #[test]
    fn enrollment_in_other_org_fails_closed() {
        let (db, program) = setup();
        let mut enrollment = ProgramEnrollment::new(&program, "user-1", None);
        enrollment.organization_id = "org-2".into();
        db.put_enrollment(&enrollment).unwrap();

        let result = try_ensure_enrollment_instance_exists(
            &db,
            &RequestContext::new("org-1"),
            &program.id,
            &enrollment.id,
        );
        assert!(matches!(
            result,
            Err(EnsureError::OrganizationMismatch { kind: "enrollment", .. })
        ));
    }

    #[test]
    fn missing_documents_fail_closed() {
        let (db, program) = setup();
        let ctx = RequestContext::new("org-1");

        assert!(matches!(
            try_ensure_enrollment_instance_exists(&db, &ctx, "nope", "enr"),
            Err(EnsureError::ProgramNotFound(_))
        ));
        assert!(matches!(
            try_ensure_enrollment_instance_exists(&db, &ctx, &program.id, "enr"),
            Err(EnsureError::EnrollmentNotFound(_))
        ));
        assert!(matches!(
            try_ensure_cohort_instance_exists(&db, &ctx, &program.id, "coh"),
            Err(EnsureError::CohortNotFound(_))
        ));
        assert!(ensure_cohort_instance_exists(&db, &ctx, &program.id, "coh").is_none());
    }

    #[test]
    fn enrollment_for_other_program_is_rejected() {
        let (db, program) = setup();
        let other = Program::new("org-1", "Other", 7);
        db.put_program(&other).unwrap();
        let enrollment = ProgramEnrollment::new(&other, "user-1", None);
        db.put_enrollment(&enrollment).unwrap();

        let result = try_ensure_enrollment_instance_exists(
            &db,
            &RequestContext::new("org-1"),
            &program.id,
            &enrollment.id,
        );
        assert!(matches!(result, Err(EnsureError::ProgramMismatch { .. })));
    }

    #[test]
    fn start_date_past_calendar_range_fails_closed() {
        let db = ProgramDb::open_memory().unwrap();
        let mut program = Program::new("org-1", "Reset", 30);
        program.include_weekends = true;
        db.put_program(&program).unwrap();
        let start = NaiveDate::MAX - Duration::days(3);
        let enrollment = ProgramEnrollment::new(&program, "user-1", Some(start));
        db.put_enrollment(&enrollment).unwrap();
        let ctx = RequestContext::new("org-1");

        assert!(matches!(
            try_ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id),
            Err(EnsureError::StartDateOutOfRange { .. })
        ));
        assert!(ensure_enrollment_instance_exists(&db, &ctx, &program.id, &enrollment.id).is_none());
        assert!(db.list_instances(&program.id).unwrap().is_empty());
    }

    #[test]
    fn stored_program_with_oversized_length_fails_closed() {
        let db = ProgramDb::open_memory().unwrap();
        let program = Program::new("org-1", "Endless", u32::MAX);
        db.put_program(&program).unwrap();
        let cohort = ProgramCohort::new(&program, "Forever", NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
        db.put_cohort(&cohort).unwrap();
        let ctx = RequestContext::new("org-1");

        assert!(matches!(
            try_ensure_cohort_instance_exists(&db, &ctx, &program.id, &cohort.id),
            Err(EnsureError::InvalidProgram { .. })
        ));
        assert!(ensure_cohort_instance_exists(&db, &ctx, &program.id, &cohort.id).is_none());
    }

    #[test]
    fn existing_instance_is_not_returned_to_other_organization() {
        let (db, program) = setup();
        let enrollment = ProgramEnrollment::new(&program, "user-1", None);
        db.put_enrollment(&enrollment).unwrap();

        let owner = RequestContext::new("org-1");
        let id = ensure_enrollment_instance_exists(&db, &owner, &program.id, &enrollment.id).unwrap();

        let other = RequestContext::new("org-2");
        let result = try_ensure_enrollment_instance_exists(&db, &other, &program.id, &enrollment.id);
        match result {
            Err(EnsureError::OrganizationMismatch { kind, id: found, .. }) => {
                assert_eq!(kind, "instance");
                assert_eq!(found, id);
            }
            other => panic!("expected organization mismatch, got {other:?}"),
        }
        assert!(ensure_enrollment_instance_exists(&db, &other, &program.id, &enrollment.id).is_none());
    }
}
