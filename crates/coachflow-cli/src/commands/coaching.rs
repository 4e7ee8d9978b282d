//! Client coaching data commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use coachflow_core::{CoachingService, ProgramDb, RequestContext};

use super::CmdResult;

#[derive(Subcommand)]
pub enum CoachingAction {
    /// Show a client's coaching data
    Show {
        /// Client ID
        client_id: String,
    },
    /// Replace the coach's notes for a client
    Note {
        /// Client ID
        client_id: String,
        /// Note text
        text: String,
    },
    /// Set focus areas (comma-separated)
    Focus {
        /// Client ID
        client_id: String,
        /// Comma-separated focus areas
        areas: String,
    },
    /// Add an action item
    ActionAdd {
        /// Client ID
        client_id: String,
        /// Action item text
        text: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Mark an action item done
    ActionDone {
        /// Client ID
        client_id: String,
        /// Action item ID
        item_id: String,
    },
    /// Remove an action item
    ActionRemove {
        /// Client ID
        client_id: String,
        /// Action item ID
        item_id: String,
    },
    /// Record a coaching session
    Session {
        /// Client ID
        client_id: String,
        /// Session summary
        summary: String,
        /// Session date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
}

pub fn run(ctx: &RequestContext, action: CoachingAction) -> CmdResult {
    let db = ProgramDb::open()?;
    let service = CoachingService::new(&db);

    let data = match action {
        CoachingAction::Show { client_id } => service.load(ctx, &client_id)?.data,
        CoachingAction::Note { client_id, text } => service.set_notes(ctx, &client_id, &text)?,
        CoachingAction::Focus { client_id, areas } => {
            let areas = areas
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            service.set_focus_areas(ctx, &client_id, areas)?
        }
        CoachingAction::ActionAdd {
            client_id,
            text,
            due,
        } => {
            let id = service.add_action_item(ctx, &client_id, &text, due)?;
            println!("Action item created: {id}");
            return Ok(());
        }
        CoachingAction::ActionDone { client_id, item_id } => {
            service.complete_action_item(ctx, &client_id, &item_id)?
        }
        CoachingAction::ActionRemove { client_id, item_id } => {
            service.remove_action_item(ctx, &client_id, &item_id)?
        }
        CoachingAction::Session {
            client_id,
            summary,
            date,
            minutes,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            service.record_session(ctx, &client_id, date, &summary, minutes)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
