//! Enrollment commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use coachflow_core::{ProgramDb, ProgramEnrollment, RequestContext};

use super::{owned_program, CmdResult};

#[derive(Subcommand)]
pub enum EnrollmentAction {
    /// Enroll a user in a program
    Create {
        /// Program ID
        program_id: String,
        /// User ID
        user_id: String,
        /// Start date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Cohort the user joins, if any
        #[arg(long)]
        cohort_id: Option<String>,
    },
    /// Get enrollment details
    Get {
        /// Enrollment ID
        id: String,
    },
}

pub fn run(ctx: &RequestContext, action: EnrollmentAction) -> CmdResult {
    let db = ProgramDb::open()?;

    match action {
        EnrollmentAction::Create {
            program_id,
            user_id,
            start,
            cohort_id,
        } => {
            let program = owned_program(&db, ctx, &program_id)?;
            let mut enrollment = ProgramEnrollment::new(&program, user_id, start);
            enrollment.cohort_id = cohort_id;
            db.put_enrollment(&enrollment)?;
            println!("Enrollment created: {}", enrollment.id);
            println!("{}", serde_json::to_string_pretty(&enrollment)?);
        }
        EnrollmentAction::Get { id } => match db.get_enrollment(&id)? {
            Some(enrollment) if ctx.owns(&enrollment.organization_id) => {
                println!("{}", serde_json::to_string_pretty(&enrollment)?);
            }
            _ => return Err(format!("enrollment not found: {id}").into()),
        },
    }
    Ok(())
}
