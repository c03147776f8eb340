//! Growing zone data model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical growing zone (room, tent, rack).
///
/// Carries a denormalized view of the recipe currently running in it; the
/// execution service is the only writer of `active_recipe_id` and
/// `current_stage_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    /// Unique zone identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Owning user
    pub owner_id: Uuid,
    /// Recipe currently executing in this zone, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_recipe_id: Option<Uuid>,
    /// Stage index of the active execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage_index: Option<usize>,
}

impl Zone {
    /// Create an idle zone with no active recipe
    pub fn new(name: impl Into<String>, owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id,
            active_recipe_id: None,
            current_stage_index: None,
        }
    }
}
