pub mod coaching;
pub mod cohort;
pub mod config;
pub mod enrollment;
pub mod instance;
pub mod program;

use coachflow_core::{Program, ProgramDb, RequestContext};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Load a program the caller's organization owns.
pub fn owned_program(
    db: &ProgramDb,
    ctx: &RequestContext,
    id: &str,
) -> Result<Program, Box<dyn std::error::Error>> {
    match db.get_program(id)? {
        Some(program) if ctx.owns(&program.organization_id) => Ok(program),
        _ => Err(format!("program not found: {id}").into()),
    }
}
