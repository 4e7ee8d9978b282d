//! Program instance commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use coachflow_core::{
    try_ensure_cohort_instance_exists, try_ensure_enrollment_instance_exists, ProgramDb,
    RequestContext,
};

use super::{owned_program, CmdResult};

#[derive(Subcommand)]
pub enum InstanceAction {
    /// Return the enrollment's instance, creating it if absent
    EnsureEnrollment {
        /// Program ID
        program_id: String,
        /// Enrollment ID
        enrollment_id: String,
    },
    /// Return the cohort's instance, creating it if absent
    EnsureCohort {
        /// Program ID
        program_id: String,
        /// Cohort ID
        cohort_id: String,
    },
    /// Get an instance document
    Get {
        /// Instance ID
        id: String,
    },
    /// List instances of a program
    List {
        /// Program ID
        program_id: String,
    },
    /// Show one day of an instance
    Day {
        /// Instance ID
        id: String,
        /// Calendar date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "index")]
        date: Option<NaiveDate>,
        /// 1-based program day
        #[arg(long)]
        index: Option<u32>,
    },
}

pub fn run(ctx: &RequestContext, action: InstanceAction) -> CmdResult {
    let db = ProgramDb::open()?;

    match action {
        InstanceAction::EnsureEnrollment {
            program_id,
            enrollment_id,
        } => {
            let id = try_ensure_enrollment_instance_exists(&db, ctx, &program_id, &enrollment_id)?;
            println!("{id}");
        }
        InstanceAction::EnsureCohort {
            program_id,
            cohort_id,
        } => {
            let id = try_ensure_cohort_instance_exists(&db, ctx, &program_id, &cohort_id)?;
            println!("{id}");
        }
        InstanceAction::Get { id } => match db.get_instance(&id)? {
            Some(instance) if ctx.owns(&instance.organization_id) => {
                println!("{}", serde_json::to_string_pretty(&instance)?);
            }
            _ => return Err(format!("instance not found: {id}").into()),
        },
        InstanceAction::List { program_id } => {
            owned_program(&db, ctx, &program_id)?;
            let instances = db.list_instances(&program_id)?;
            println!("{}", serde_json::to_string_pretty(&instances)?);
        }
        InstanceAction::Day { id, date, index } => {
            let instance = match db.get_instance(&id)? {
                Some(instance) if ctx.owns(&instance.organization_id) => instance,
                _ => return Err(format!("instance not found: {id}").into()),
            };
            let day = match (date, index) {
                (Some(date), _) => instance.day_on(date),
                (None, Some(index)) => instance.day(index),
                (None, None) => instance.day_on(chrono::Local::now().date_naive()),
            };
            match day {
                Some(day) => println!("{}", serde_json::to_string_pretty(day)?),
                None => println!("No program day on that date."),
            }
        }
    }
    Ok(())
}
