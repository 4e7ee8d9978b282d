//! Cohort commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use coachflow_core::{ProgramCohort, ProgramDb, RequestContext};

use super::{owned_program, CmdResult};

#[derive(Subcommand)]
pub enum CohortAction {
    /// Create a cohort for a program
    Create {
        /// Program ID
        program_id: String,
        /// Cohort name
        name: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
    },
    /// Get cohort details
    Get {
        /// Cohort ID
        id: String,
    },
}

pub fn run(ctx: &RequestContext, action: CohortAction) -> CmdResult {
    let db = ProgramDb::open()?;

    match action {
        CohortAction::Create {
            program_id,
            name,
            start,
        } => {
            let program = owned_program(&db, ctx, &program_id)?;
            let cohort = ProgramCohort::new(&program, name, start);
            db.put_cohort(&cohort)?;
            println!("Cohort created: {}", cohort.id);
            println!("{}", serde_json::to_string_pretty(&cohort)?);
        }
        CohortAction::Get { id } => match db.get_cohort(&id)? {
            Some(cohort) if ctx.owns(&cohort.organization_id) => {
                println!("{}", serde_json::to_string_pretty(&cohort)?);
            }
            _ => return Err(format!("cohort not found: {id}").into()),
        },
    }
    Ok(())
}
