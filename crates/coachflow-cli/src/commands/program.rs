//! Program template commands for CLI.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use coachflow_core::{
    build_program_instance, Config, DistributionPolicy, InstanceKind, Program, ProgramDb,
    ProgramWeekTemplate, RequestContext,
};

use super::{owned_program, CmdResult};

#[derive(Subcommand)]
pub enum ProgramAction {
    /// Create a new program
    Create {
        /// Program name
        name: String,
        /// Program length in active days (default from config)
        #[arg(long)]
        length_days: Option<u32>,
        /// Count Saturdays and Sundays as program days
        #[arg(long)]
        include_weekends: Option<bool>,
        /// Policy for untagged tasks: spread, all_days or first_day
        #[arg(long)]
        distribution: Option<DistributionPolicy>,
        /// Focus slots per day
        #[arg(long)]
        focus_slots: Option<u32>,
        /// JSON file holding the week templates array
        #[arg(long)]
        weeks_file: Option<PathBuf>,
    },
    /// Replace a program's week templates
    SetWeeks {
        /// Program ID
        id: String,
        /// JSON file holding the week templates array
        weeks_file: PathBuf,
    },
    /// Get program details
    Get {
        /// Program ID
        id: String,
    },
    /// List programs of the organization
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the weeks an instance would get, without saving anything
    Preview {
        /// Program ID
        id: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
    },
}

fn read_weeks(path: &PathBuf) -> Result<Vec<ProgramWeekTemplate>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn run(ctx: &RequestContext, action: ProgramAction) -> CmdResult {
    let db = ProgramDb::open()?;

    match action {
        ProgramAction::Create {
            name,
            length_days,
            include_weekends,
            distribution,
            focus_slots,
            weeks_file,
        } => {
            let defaults = Config::load_or_default().defaults;
            let mut program = Program::new(
                &ctx.organization_id,
                name,
                length_days.unwrap_or(defaults.length_days),
            );
            defaults.apply(&mut program);
            if let Some(include_weekends) = include_weekends {
                program.include_weekends = include_weekends;
            }
            if let Some(distribution) = distribution {
                program.distribution = distribution;
            }
            if let Some(focus_slots) = focus_slots {
                program.daily_focus_slots = focus_slots;
            }
            if let Some(path) = weeks_file {
                program.weeks = read_weeks(&path)?;
            }
            program.validate()?;
            db.put_program(&program)?;
            println!("Program created: {}", program.id);
            println!("{}", serde_json::to_string_pretty(&program)?);
        }
        ProgramAction::SetWeeks { id, weeks_file } => {
            let mut program = owned_program(&db, ctx, &id)?;
            program.weeks = read_weeks(&weeks_file)?;
            program.validate()?;
            db.put_program(&program)?;
            println!("Program updated: {} ({} week templates)", program.id, program.weeks.len());
        }
        ProgramAction::Get { id } => {
            let program = owned_program(&db, ctx, &id)?;
            println!("{}", serde_json::to_string_pretty(&program)?);
        }
        ProgramAction::List { json } => {
            let programs = db.list_programs(&ctx.organization_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&programs)?);
            } else if programs.is_empty() {
                println!("No programs found.");
            } else {
                for p in &programs {
                    println!(
                        "{}  {} ({} days, {})",
                        p.id,
                        p.name,
                        p.length_days,
                        if p.include_weekends { "every day" } else { "weekdays" }
                    );
                }
            }
        }
        ProgramAction::Preview { id, start } => {
            let program = owned_program(&db, ctx, &id)?;
            program.validate()?;
            let preview = build_program_instance(
                &program,
                InstanceKind::Individual {
                    enrollment_id: "preview".into(),
                },
                start,
            )
            .ok_or_else(|| format!("program {} cannot start on {start}: dates out of range", program.id))?;
            println!("{}", serde_json::to_string_pretty(&preview.weeks)?);
        }
    }
    Ok(())
}
