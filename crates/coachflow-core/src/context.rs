//! Request-scoped caller context.

use serde::{Deserialize, Serialize};

/// Who is making a request. Passed explicitly to every operation that
/// checks organization ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
}

impl RequestContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            actor_id: None,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Whether a document owned by `organization_id` is visible to this caller.
    pub fn owns(&self, organization_id: &str) -> bool {
        self.organization_id == organization_id
    }
}
