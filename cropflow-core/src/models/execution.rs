//! Recipe execution data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution status for a recipe running in a zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Normal operation, stage clock running
    Active,
    /// Clock frozen, excluded from the sweep
    Paused,
    /// Stage reached minimum duration, human decision pending
    WaitingApproval,
    /// All stages signed off (terminal)
    Completed,
    /// Manually stopped before completion (terminal)
    Aborted,
}

impl ExecutionStatus {
    /// Live statuses occupy their zone; at most one live execution per zone.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Active | ExecutionStatus::Paused | ExecutionStatus::WaitingApproval
        )
    }

    /// Terminal statuses permit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Aborted)
    }
}

/// Completion record for one finished stage, appended at approval time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Index of the completed stage within the recipe
    pub stage_index: usize,
    /// Stage name at completion time
    pub stage_name: String,
    /// When the stage began
    pub started_at: DateTime<Utc>,
    /// When the transition was approved
    pub completed_at: DateTime<Utc>,
    /// Whole days spent in the stage, computed at decision time
    pub days_in_stage: u32,
    /// Operator who signed off the transition
    pub approved_by: Uuid,
    /// Operator notes attached to the sign-off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Whether the operator reported the stage's manual tasks done
    pub manual_tasks_completed: bool,
}

/// Pending approval request raised when a stage reaches its minimum duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Index of the stage awaiting sign-off
    pub stage_index: usize,
    /// Stage name
    pub stage_name: String,
    /// When the request was first raised
    pub requested_at: DateTime<Utc>,
    /// Days in stage when the request was raised
    pub days_in_stage: u32,
    /// Stage minimum duration in days
    pub min_duration_days: u32,
    /// Stage soft cap in days
    pub max_duration_days: u32,
    /// Human-readable prompt shown to the operator
    pub message: String,
    /// Manual tasks the operator should confirm before approving
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_tasks: Vec<String>,
}

/// One activation of a recipe in a zone.
///
/// Created by `ExecutionService::start` and mutated only by the service's
/// transition functions; `stage_history` is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeExecution {
    /// Unique execution identifier
    pub id: Uuid,
    /// Zone the recipe is running in
    pub zone_id: Uuid,
    /// Recipe being executed
    pub recipe_id: Uuid,
    /// Associated production batch, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    /// 0-based index of the current stage
    pub current_stage_index: usize,
    /// Current state-machine state
    pub status: ExecutionStatus,
    /// When the execution began
    pub started_at: DateTime<Utc>,
    /// When the current stage began; resets on every stage advance
    pub current_stage_started_at: DateTime<Utc>,
    /// Completion records for finished stages, in stage order
    #[serde(default)]
    pub stage_history: Vec<StageRecord>,
    /// Outstanding approval request, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_approval: Option<PendingApproval>,
    /// When the outstanding approval was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_requested_at: Option<DateTime<Utc>>,
    /// When the execution reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether stage entry drives zone equipment automatically
    pub auto_environment_control: bool,
    /// Owning user
    pub owner_id: Uuid,
}

impl RecipeExecution {
    /// Whole days elapsed in the current stage.
    ///
    /// Floor division over wall-clock time: a stage started at 23:59 finishes
    /// its first day roughly 24 hours later, not at midnight. Paused time is
    /// not subtracted.
    pub fn days_in_current_stage(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = now - self.current_stage_started_at;
        if elapsed < chrono::Duration::zero() {
            return 0;
        }
        (elapsed.num_seconds() / 86_400) as u32
    }
}

/// Execution snapshot enriched with computed progress, returned by the
/// service's query surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProgress {
    /// The underlying execution
    pub execution: RecipeExecution,
    /// Crop name from the recipe
    pub crop_name: String,
    /// Name of the current stage
    pub stage_name: String,
    /// Total number of stages in the recipe
    pub total_stages: usize,
    /// Whole days in the current stage
    pub days_in_current_stage: u32,
    /// Percentage of total recipe duration elapsed, capped at 100
    pub progress_percent: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn execution(stage_started: DateTime<Utc>) -> RecipeExecution {
        RecipeExecution {
            id: Uuid::new_v4(),
            zone_id: Uuid::new_v4(),
            recipe_id: Uuid::new_v4(),
            batch_number: None,
            current_stage_index: 0,
            status: ExecutionStatus::Active,
            started_at: stage_started,
            current_stage_started_at: stage_started,
            stage_history: vec![],
            pending_approval: None,
            approval_requested_at: None,
            completed_at: None,
            auto_environment_control: true,
            owner_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ExecutionStatus::WaitingApproval).unwrap();
        assert_eq!(json, "\"waiting_approval\"");
    }

    #[test]
    fn test_days_in_stage_floor_division() {
        let start = Utc::now();
        let exec = execution(start);

        // 23h59m is still day 0
        assert_eq!(
            exec.days_in_current_stage(start + Duration::minutes(23 * 60 + 59)),
            0
        );
        // 24h crosses into day 1
        assert_eq!(exec.days_in_current_stage(start + Duration::hours(24)), 1);
        assert_eq!(
            exec.days_in_current_stage(start + Duration::hours(24 * 3 + 12)),
            3
        );
    }

    #[test]
    fn test_days_in_stage_clock_skew() {
        let start = Utc::now();
        let exec = execution(start);
        assert_eq!(exec.days_in_current_stage(start - Duration::hours(2)), 0);
    }

    #[test]
    fn test_live_and_terminal_statuses() {
        assert!(ExecutionStatus::Active.is_live());
        assert!(ExecutionStatus::Paused.is_live());
        assert!(ExecutionStatus::WaitingApproval.is_live());
        assert!(!ExecutionStatus::Completed.is_live());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Aborted.is_terminal());
        assert!(!ExecutionStatus::Active.is_terminal());
    }
}
