//! Recipe execution state machine.
//!
//! Owns every transition of a `RecipeExecution`:
//! active -> waiting_approval -> active/completed, paused <-> active, and
//! abort from any live state. Collaborators (equipment actuation,
//! notifications, the store) are injected; there are no ambient singletons.

use crate::clock::Clock;
use crate::execution::adapters::{
    EquipmentAdapter, NotificationAdapter, NotificationEvent, NotificationKind,
};
use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::execution::stage_config::stage_commands;
use crate::execution::store::ExecutionStore;
use crate::models::execution::{
    ExecutionProgress, ExecutionStatus, PendingApproval, RecipeExecution, StageRecord,
};
use crate::models::recipe::{Recipe, Stage};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Policy knobs for the execution service
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Reject approvals whose stage declares manual tasks that were not
    /// confirmed. Off by default: the confirmation flag is advisory.
    pub enforce_manual_tasks: bool,
}

/// Operator decision on a pending stage approval
#[derive(Debug, Clone, Default)]
pub struct ApprovalDecision {
    /// Whether the stage is signed off as complete
    pub approved: bool,
    /// Free-form operator notes
    pub notes: Option<String>,
    /// Whether the stage's manual tasks were reported done
    pub manual_tasks_completed: bool,
}

/// Recipe execution service with injected collaborators
pub struct ExecutionService {
    /// Persistence layer
    store: Arc<ExecutionStore>,
    /// Equipment actuation collaborator
    equipment: Arc<dyn EquipmentAdapter>,
    /// Alerting collaborator
    notifier: Arc<dyn NotificationAdapter>,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Policy configuration
    config: ServiceConfig,
    /// Per-zone locks serializing competing start calls
    zone_locks: DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>,
}

impl ExecutionService {
    /// Create a new execution service
    pub fn new(
        store: Arc<ExecutionStore>,
        equipment: Arc<dyn EquipmentAdapter>,
        notifier: Arc<dyn NotificationAdapter>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            equipment,
            notifier,
            clock,
            config,
            zone_locks: DashMap::new(),
        }
    }

    /// Store handle, for read-side consumers
    pub fn store(&self) -> Arc<ExecutionStore> {
        self.store.clone()
    }

    fn zone_lock(&self, zone_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.zone_locks
            .entry(zone_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Start executing a recipe in a zone.
    ///
    /// Fails with `ZoneBusy` if the zone already has a live execution; the
    /// check-and-insert is atomic, so of two concurrent starts exactly one
    /// wins. Stage-0 equipment configuration and the start notification are
    /// dispatched best-effort after the execution is durable.
    pub async fn start(
        &self,
        zone_id: Uuid,
        recipe_id: Uuid,
        batch_number: Option<String>,
        actor: Uuid,
    ) -> ExecutionResult<RecipeExecution> {
        let lock = self.zone_lock(zone_id);
        let _guard = lock.lock().await;

        let zone = self
            .store
            .get_zone(zone_id)
            .ok_or(ExecutionError::ZoneNotFound(zone_id))?;
        let recipe = self
            .store
            .get_recipe(recipe_id)
            .ok_or(ExecutionError::RecipeNotFound(recipe_id))?;
        recipe
            .validate()
            .map_err(|reason| ExecutionError::RecipeInvalid { recipe_id, reason })?;

        let now = self.clock.now();
        let execution = RecipeExecution {
            id: Uuid::new_v4(),
            zone_id,
            recipe_id,
            batch_number,
            current_stage_index: 0,
            status: ExecutionStatus::Active,
            started_at: now,
            current_stage_started_at: now,
            stage_history: vec![],
            pending_approval: None,
            approval_requested_at: None,
            completed_at: None,
            auto_environment_control: true,
            owner_id: actor,
        };

        self.store.create_execution(execution.clone())?;
        self.sync_zone(zone_id, Some(recipe_id), Some(0));

        tracing::info!(
            execution_id = %execution.id,
            zone = %zone.name,
            crop = %recipe.crop_name,
            "Recipe execution started"
        );

        self.apply_stage_configuration(&execution, &recipe.stages[0])
            .await;
        self.emit(NotificationEvent {
            kind: NotificationKind::ExecutionStarted,
            execution_id: execution.id,
            zone_id,
            owner_id: execution.owner_id,
            title: "Recipe Execution Started".to_string(),
            message: format!("{} recipe started in {}", recipe.crop_name, zone.name),
        })
        .await;

        Ok(execution)
    }

    /// Evaluate one execution against its recipe (invoked by the sweep).
    ///
    /// Idempotent: re-evaluating an execution already waiting for approval
    /// neither overwrites `requested_at` nor repeats the approval
    /// notification. Crossing the soft cap while waiting emits an overdue
    /// escalation on every sweep but changes no state.
    pub async fn evaluate(&self, execution_id: Uuid) -> ExecutionResult<()> {
        let execution = self
            .store
            .get_execution(execution_id)
            .ok_or(ExecutionError::ExecutionNotFound(execution_id))?;

        if !matches!(
            execution.status,
            ExecutionStatus::Active | ExecutionStatus::WaitingApproval
        ) {
            return Ok(());
        }

        let recipe = self
            .store
            .get_recipe(execution.recipe_id)
            .ok_or(ExecutionError::RecipeNotFound(execution.recipe_id))?;
        let Some(stage) = recipe.stages.get(execution.current_stage_index).cloned() else {
            tracing::warn!(
                execution_id = %execution_id,
                stage_index = execution.current_stage_index,
                "Execution references a stage index outside its recipe"
            );
            return Ok(());
        };

        let now = self.clock.now();
        let days_in_stage = execution.days_in_current_stage(now);
        let min_duration = stage.duration_days;
        let max_duration = stage.effective_max_duration_days();

        tracing::debug!(
            execution_id = %execution_id,
            stage = %stage.name,
            day = days_in_stage,
            min = min_duration,
            max = max_duration,
            "Stage check"
        );

        if execution.status == ExecutionStatus::Active && days_in_stage >= min_duration {
            let pending = PendingApproval {
                stage_index: execution.current_stage_index,
                stage_name: stage.name.clone(),
                requested_at: now,
                days_in_stage,
                min_duration_days: min_duration,
                max_duration_days: max_duration,
                message: format!(
                    "Stage \"{}\" has reached day {} (expected: {}-{} days). Is this stage complete?",
                    stage.name, days_in_stage, min_duration, max_duration
                ),
                manual_tasks: stage.manual_tasks.clone(),
            };

            // The sweep can race a user decision on the same execution; only
            // the closure that still observes `active` raises the request.
            let mut raised = false;
            let stage_index = execution.current_stage_index;
            self.store.update_execution(execution_id, |e| {
                if e.status == ExecutionStatus::Active && e.current_stage_index == stage_index {
                    e.status = ExecutionStatus::WaitingApproval;
                    e.approval_requested_at = Some(pending.requested_at);
                    e.pending_approval = Some(pending.clone());
                    raised = true;
                }
                Ok(())
            })?;

            if raised {
                tracing::info!(
                    execution_id = %execution_id,
                    stage = %stage.name,
                    "Stage reached minimum duration, approval requested"
                );
                self.emit(NotificationEvent {
                    kind: NotificationKind::ApprovalRequested,
                    execution_id,
                    zone_id: execution.zone_id,
                    owner_id: execution.owner_id,
                    title: format!("Stage Approval Required: {}", recipe.crop_name),
                    message: format!(
                        "Stage \"{}\" has reached day {} (expected: {}-{} days). Is this stage complete?",
                        stage.name, days_in_stage, min_duration, max_duration
                    ),
                })
                .await;
            }
        } else if execution.status == ExecutionStatus::WaitingApproval
            && days_in_stage > max_duration
        {
            tracing::warn!(
                execution_id = %execution_id,
                stage = %stage.name,
                day = days_in_stage,
                max = max_duration,
                "Stage exceeded maximum duration without approval"
            );
            self.emit(NotificationEvent {
                kind: NotificationKind::StageOverdue,
                execution_id,
                zone_id: execution.zone_id,
                owner_id: execution.owner_id,
                title: "Urgent: Stage Approval Overdue".to_string(),
                message: format!(
                    "{} has been in \"{}\" for {} days (max: {}). Please approve the stage transition.",
                    recipe.crop_name, stage.name, days_in_stage, max_duration
                ),
            })
            .await;
        }

        Ok(())
    }

    /// Apply the operator's decision on a pending approval.
    ///
    /// Approval appends the stage-history record and either advances to the
    /// next stage or completes the recipe; decline returns the stage to
    /// `active` untouched. Fails with `NoPendingApproval` unless the
    /// execution is waiting.
    pub async fn decide(
        &self,
        execution_id: Uuid,
        actor: Uuid,
        decision: ApprovalDecision,
    ) -> ExecutionResult<RecipeExecution> {
        let execution = self
            .store
            .get_execution(execution_id)
            .ok_or(ExecutionError::ExecutionNotFound(execution_id))?;
        let recipe = self
            .store
            .get_recipe(execution.recipe_id)
            .ok_or(ExecutionError::RecipeNotFound(execution.recipe_id))?;
        let stage = recipe
            .stages
            .get(execution.current_stage_index)
            .cloned()
            .ok_or_else(|| {
                ExecutionError::InvalidTransition(format!(
                    "stage index {} outside recipe",
                    execution.current_stage_index
                ))
            })?;

        if decision.approved && !decision.manual_tasks_completed && !stage.manual_tasks.is_empty() {
            if self.config.enforce_manual_tasks {
                return Err(ExecutionError::InvalidTransition(format!(
                    "stage \"{}\" has {} unconfirmed manual tasks",
                    stage.name,
                    stage.manual_tasks.len()
                )));
            }
            tracing::warn!(
                execution_id = %execution_id,
                stage = %stage.name,
                tasks = stage.manual_tasks.len(),
                "Approving stage without confirming its manual tasks"
            );
        }

        let now = self.clock.now();
        let total_stages = recipe.stages.len();
        let stage_name = stage.name.clone();
        let approved = decision.approved;

        let updated = self.store.update_execution(execution_id, |e| {
            if e.status != ExecutionStatus::WaitingApproval {
                return Err(ExecutionError::NoPendingApproval(execution_id));
            }

            if approved {
                e.stage_history.push(StageRecord {
                    stage_index: e.current_stage_index,
                    stage_name: stage_name.clone(),
                    started_at: e.current_stage_started_at,
                    completed_at: now,
                    days_in_stage: e.days_in_current_stage(now),
                    approved_by: actor,
                    notes: decision.notes.clone(),
                    manual_tasks_completed: decision.manual_tasks_completed,
                });

                if e.current_stage_index + 1 == total_stages {
                    e.status = ExecutionStatus::Completed;
                    e.completed_at = Some(now);
                } else {
                    e.current_stage_index += 1;
                    e.current_stage_started_at = now;
                    e.status = ExecutionStatus::Active;
                }
            } else {
                // Declined: the stage is not complete, so no history entry
                e.status = ExecutionStatus::Active;
            }
            e.pending_approval = None;
            e.approval_requested_at = None;
            Ok(())
        })?;

        match (updated.status, approved) {
            (ExecutionStatus::Completed, _) => {
                tracing::info!(
                    execution_id = %execution_id,
                    crop = %recipe.crop_name,
                    "Recipe execution completed"
                );
                self.sync_zone(updated.zone_id, None, None);
                self.emit(NotificationEvent {
                    kind: NotificationKind::ExecutionCompleted,
                    execution_id,
                    zone_id: updated.zone_id,
                    owner_id: updated.owner_id,
                    title: "Recipe Execution Complete".to_string(),
                    message: format!(
                        "{} has completed all stages. Ready for harvest!",
                        recipe.crop_name
                    ),
                })
                .await;
            }
            (_, true) => {
                let next_stage = &recipe.stages[updated.current_stage_index];
                tracing::info!(
                    execution_id = %execution_id,
                    from = %stage_name,
                    to = %next_stage.name,
                    "Stage transition complete"
                );
                self.sync_zone(
                    updated.zone_id,
                    Some(updated.recipe_id),
                    Some(updated.current_stage_index),
                );
                self.apply_stage_configuration(&updated, next_stage).await;
                self.emit(NotificationEvent {
                    kind: NotificationKind::TransitionApplied,
                    execution_id,
                    zone_id: updated.zone_id,
                    owner_id: updated.owner_id,
                    title: "Stage Transition Complete".to_string(),
                    message: format!(
                        "{} has moved to \"{}\" stage.",
                        recipe.crop_name, next_stage.name
                    ),
                })
                .await;
            }
            (_, false) => {
                tracing::info!(
                    execution_id = %execution_id,
                    stage = %stage_name,
                    "Stage transition declined, stage continues"
                );
                self.emit(NotificationEvent {
                    kind: NotificationKind::StageExtended,
                    execution_id,
                    zone_id: updated.zone_id,
                    owner_id: updated.owner_id,
                    title: "Stage Extension".to_string(),
                    message: format!(
                        "{} will continue in \"{}\" stage.",
                        recipe.crop_name, stage_name
                    ),
                })
                .await;
            }
        }

        Ok(updated)
    }

    /// Freeze the stage clock. Only valid from `active`.
    ///
    /// Pausing removes the execution from the sweep; elapsed wall-clock time
    /// still counts toward `days_in_stage` once resumed.
    pub async fn pause(&self, execution_id: Uuid) -> ExecutionResult<RecipeExecution> {
        let updated = self.store.update_execution(execution_id, |e| {
            if e.status != ExecutionStatus::Active {
                return Err(ExecutionError::InvalidTransition(format!(
                    "cannot pause execution in {:?} state",
                    e.status
                )));
            }
            e.status = ExecutionStatus::Paused;
            Ok(())
        })?;
        tracing::info!(execution_id = %execution_id, "Recipe execution paused");
        Ok(updated)
    }

    /// Resume a paused execution. Only valid from `paused`.
    pub async fn resume(&self, execution_id: Uuid) -> ExecutionResult<RecipeExecution> {
        let updated = self.store.update_execution(execution_id, |e| {
            if e.status != ExecutionStatus::Paused {
                return Err(ExecutionError::InvalidTransition(format!(
                    "cannot resume execution in {:?} state",
                    e.status
                )));
            }
            e.status = ExecutionStatus::Active;
            Ok(())
        })?;
        tracing::info!(execution_id = %execution_id, "Recipe execution resumed");
        Ok(updated)
    }

    /// Abort an execution from any non-terminal state.
    ///
    /// The interrupted stage gets no history entry; the zone is released.
    pub async fn abort(&self, execution_id: Uuid) -> ExecutionResult<RecipeExecution> {
        let now = self.clock.now();
        let updated = self.store.update_execution(execution_id, |e| {
            if e.status.is_terminal() {
                return Err(ExecutionError::InvalidTransition(format!(
                    "cannot abort execution in {:?} state",
                    e.status
                )));
            }
            e.status = ExecutionStatus::Aborted;
            e.completed_at = Some(now);
            Ok(())
        })?;

        tracing::info!(execution_id = %execution_id, "Recipe execution aborted");
        self.sync_zone(updated.zone_id, None, None);
        self.emit(NotificationEvent {
            kind: NotificationKind::ExecutionAborted,
            execution_id,
            zone_id: updated.zone_id,
            owner_id: updated.owner_id,
            title: "Recipe Execution Aborted".to_string(),
            message: "The recipe execution was stopped before completion.".to_string(),
        })
        .await;

        Ok(updated)
    }

    /// Get execution by ID
    pub fn get(&self, execution_id: Uuid) -> ExecutionResult<RecipeExecution> {
        self.store
            .get_execution(execution_id)
            .ok_or(ExecutionError::ExecutionNotFound(execution_id))
    }

    /// Get the live execution occupying a zone, if any
    pub fn get_by_zone(&self, zone_id: Uuid) -> Option<RecipeExecution> {
        self.store.live_execution_for_zone(zone_id)
    }

    /// List executions, optionally filtered by zone and status
    pub fn list(
        &self,
        zone_id: Option<Uuid>,
        status: Option<ExecutionStatus>,
    ) -> Vec<RecipeExecution> {
        self.store.list_executions(zone_id, status)
    }

    /// Execution snapshot with computed progress.
    ///
    /// Progress is the share of total recipe duration elapsed: recorded days
    /// of completed stages plus days in the current stage, capped at 100%.
    pub fn progress(&self, execution_id: Uuid) -> ExecutionResult<ExecutionProgress> {
        let execution = self.get(execution_id)?;
        let recipe = self
            .store
            .get_recipe(execution.recipe_id)
            .ok_or(ExecutionError::RecipeNotFound(execution.recipe_id))?;

        let now = self.clock.now();
        let days_in_current_stage = if execution.status.is_terminal() {
            0
        } else {
            execution.days_in_current_stage(now)
        };

        let recorded_days: u32 = execution
            .stage_history
            .iter()
            .map(|r| r.days_in_stage)
            .sum();
        let total_days = recipe.total_duration_days().max(1);
        let progress_percent = if execution.status == ExecutionStatus::Completed {
            100
        } else {
            (((recorded_days + days_in_current_stage) * 100) / total_days).min(100)
        };

        let stage_name = recipe
            .stages
            .get(execution.current_stage_index)
            .map(|s| s.name.clone())
            .unwrap_or_default();

        Ok(ExecutionProgress {
            crop_name: recipe.crop_name.clone(),
            stage_name,
            total_stages: recipe.stages.len(),
            days_in_current_stage,
            progress_percent,
            execution,
        })
    }

    /// Dispatch a stage's derived equipment commands, best-effort.
    ///
    /// Failures are logged and never block the transition that triggered the
    /// configuration change.
    async fn apply_stage_configuration(&self, execution: &RecipeExecution, stage: &Stage) {
        if !execution.auto_environment_control {
            return;
        }

        for command in stage_commands(execution.zone_id, stage) {
            let device = command.device;
            if let Err(error) = self.equipment.dispatch(command).await {
                tracing::warn!(
                    execution_id = %execution.id,
                    zone_id = %execution.zone_id,
                    device = ?device,
                    %error,
                    "Equipment command dispatch failed"
                );
            }
        }
        tracing::info!(
            execution_id = %execution.id,
            stage = %stage.name,
            "Stage configuration applied"
        );
    }

    /// Emit a notification, best-effort
    async fn emit(&self, event: NotificationEvent) {
        let kind = event.kind;
        if let Err(error) = self.notifier.notify(event).await {
            tracing::warn!(kind = ?kind, %error, "Notification delivery failed");
        }
    }

    /// Keep the zone's denormalized active-recipe view in sync.
    ///
    /// Runs after the execution write; retried once on failure and otherwise
    /// logged, since the execution record is the source of truth.
    fn sync_zone(&self, zone_id: Uuid, recipe_id: Option<Uuid>, stage_index: Option<usize>) {
        for attempt in 0..2 {
            match self.store.mark_active_recipe(zone_id, recipe_id, stage_index) {
                Ok(()) => return,
                Err(error) if attempt == 0 => {
                    tracing::warn!(zone_id = %zone_id, %error, "Zone sync failed, retrying");
                }
                Err(error) => {
                    tracing::error!(zone_id = %zone_id, %error, "Zone sync failed");
                }
            }
        }
    }

    /// Recipe lookup helper for presentation layers
    pub fn recipe_for(&self, execution: &RecipeExecution) -> ExecutionResult<Recipe> {
        self.store
            .get_recipe(execution.recipe_id)
            .ok_or(ExecutionError::RecipeNotFound(execution.recipe_id))
    }
}
