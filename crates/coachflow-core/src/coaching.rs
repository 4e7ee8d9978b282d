//! A coach's private notes, action items and session history for one client.
//!
//! Documents are keyed `"{organization_id}_{client_id}"`. Older data was
//! keyed by the bare client id; it is still read, and moved to the scoped
//! key the next time it is saved.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{CoreError, Result, ValidationError};
use crate::storage::ProgramDb;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingSession {
    pub id: String,
    pub date: NaiveDate,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCoachingData {
    /// Empty on legacy documents.
    #[serde(default)]
    pub organization_id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    /// Newest first.
    #[serde(default)]
    pub sessions: Vec<CoachingSession>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ClientCoachingData {
    pub fn empty(organization_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            client_id: client_id.into(),
            coach_id: None,
            notes: String::new(),
            action_items: Vec::new(),
            sessions: Vec::new(),
            focus_areas: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn open_action_items(&self) -> impl Iterator<Item = &ActionItem> {
        self.action_items.iter().filter(|a| !a.completed)
    }
}

/// Storage key for a client's coaching document.
pub fn coaching_key(organization_id: &str, client_id: &str) -> String {
    format!("{organization_id}_{client_id}")
}

/// Which key a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocOrigin {
    Scoped,
    Legacy,
    New,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCoachingData {
    pub data: ClientCoachingData,
    pub origin: DocOrigin,
}

/// Operations on client coaching documents.
pub struct CoachingService<'a> {
    db: &'a ProgramDb,
}

impl<'a> CoachingService<'a> {
    pub fn new(db: &'a ProgramDb) -> Self {
        Self { db }
    }

    /// Load the scoped document, falling back to the legacy key.
    ///
    /// A legacy document stamped with another organization is treated as
    /// absent. With nothing stored, returns an empty document.
    pub fn load(&self, ctx: &RequestContext, client_id: &str) -> Result<LoadedCoachingData> {
        let key = coaching_key(&ctx.organization_id, client_id);
        if let Some(data) = self.db.get_coaching_doc(&key)? {
            return Ok(LoadedCoachingData {
                data,
                origin: DocOrigin::Scoped,
            });
        }

        if let Some(mut data) = self.db.get_coaching_doc(client_id)? {
            if data.organization_id.is_empty() || ctx.owns(&data.organization_id) {
                tracing::debug!(client_id, "using legacy coaching document");
                data.organization_id = ctx.organization_id.clone();
                return Ok(LoadedCoachingData {
                    data,
                    origin: DocOrigin::Legacy,
                });
            }
            tracing::warn!(
                client_id,
                owner = %data.organization_id,
                caller = %ctx.organization_id,
                "ignoring legacy coaching document owned by another organization"
            );
        }

        Ok(LoadedCoachingData {
            data: ClientCoachingData::empty(&ctx.organization_id, client_id),
            origin: DocOrigin::New,
        })
    }

    /// Save under the scoped key, removing the legacy copy it was read from.
    pub fn save(&self, ctx: &RequestContext, mut loaded: LoadedCoachingData) -> Result<ClientCoachingData> {
        loaded.data.organization_id = ctx.organization_id.clone();
        loaded.data.updated_at = Utc::now();
        if loaded.data.coach_id.is_none() {
            loaded.data.coach_id = ctx.actor_id.clone();
        }

        let key = coaching_key(&ctx.organization_id, &loaded.data.client_id);
        self.db.put_coaching_doc(&key, &loaded.data)?;

        if loaded.origin == DocOrigin::Legacy {
            self.db.delete_coaching_doc(&loaded.data.client_id)?;
            tracing::info!(client_id = %loaded.data.client_id, "migrated legacy coaching document");
        }
        Ok(loaded.data)
    }

    fn update<F>(&self, ctx: &RequestContext, client_id: &str, f: F) -> Result<ClientCoachingData>
    where
        F: FnOnce(&mut ClientCoachingData) -> Result<()>,
    {
        let mut loaded = self.load(ctx, client_id)?;
        f(&mut loaded.data)?;
        self.save(ctx, loaded)
    }

    pub fn set_notes(&self, ctx: &RequestContext, client_id: &str, notes: &str) -> Result<ClientCoachingData> {
        self.update(ctx, client_id, |data| {
            data.notes = notes.to_string();
            Ok(())
        })
    }

    pub fn set_focus_areas(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        focus_areas: Vec<String>,
    ) -> Result<ClientCoachingData> {
        self.update(ctx, client_id, |data| {
            data.focus_areas = focus_areas;
            Ok(())
        })
    }

    /// Append an action item and return its id.
    pub fn add_action_item(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        text: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyField("text".into()).into());
        }
        let id = Uuid::new_v4().to_string();
        self.update(ctx, client_id, |data| {
            data.action_items.push(ActionItem {
                id: id.clone(),
                text: text.trim().to_string(),
                due_date,
                completed: false,
                created_at: Utc::now(),
                completed_at: None,
            });
            Ok(())
        })?;
        Ok(id)
    }

    pub fn complete_action_item(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        item_id: &str,
    ) -> Result<ClientCoachingData> {
        self.update(ctx, client_id, |data| {
            let item = data
                .action_items
                .iter_mut()
                .find(|a| a.id == item_id)
                .ok_or_else(|| CoreError::not_found("action item", item_id))?;
            if !item.completed {
                item.completed = true;
                item.completed_at = Some(Utc::now());
            }
            Ok(())
        })
    }

    pub fn remove_action_item(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        item_id: &str,
    ) -> Result<ClientCoachingData> {
        self.update(ctx, client_id, |data| {
            let before = data.action_items.len();
            data.action_items.retain(|a| a.id != item_id);
            if data.action_items.len() == before {
                return Err(CoreError::not_found("action item", item_id));
            }
            Ok(())
        })
    }

    /// Record a coaching session; history stays sorted newest first.
    pub fn record_session(
        &self,
        ctx: &RequestContext,
        client_id: &str,
        date: NaiveDate,
        summary: &str,
        duration_minutes: Option<u32>,
    ) -> Result<ClientCoachingData> {
        self.update(ctx, client_id, |data| {
            data.sessions.push(CoachingSession {
                id: Uuid::new_v4().to_string(),
                date,
                summary: summary.to_string(),
                duration_minutes,
            });
            data.sessions.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(())
        })
    }
}
