//! External collaborator traits: equipment actuation and notifications.
//!
//! Both are fire-and-forget from the state machine's perspective - a failed
//! dispatch is logged and never fails the transition that triggered it.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of equipment a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Heater,
    Humidifier,
    Fan,
    Light,
    Pump,
}

/// Actuation verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    SetValue,
    TurnOn,
    TurnOff,
    SetMode,
}

/// One derived per-device command for a zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentCommand {
    /// Target zone
    pub zone_id: Uuid,
    /// Equipment kind the command addresses
    pub device: DeviceKind,
    /// Actuation verb
    pub command: CommandKind,
    /// Setpoint or intensity payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Operating mode payload (e.g. "scheduled")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Dispatches derived equipment commands to the actuation layer
#[async_trait]
pub trait EquipmentAdapter: Send + Sync {
    /// Dispatch a single command to the zone's equipment
    async fn dispatch(&self, command: EquipmentCommand) -> Result<()>;
}

/// Notification event kinds emitted by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExecutionStarted,
    ApprovalRequested,
    StageOverdue,
    TransitionApplied,
    StageExtended,
    ExecutionCompleted,
    ExecutionAborted,
}

/// Notification dispatched to the alerting collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// What happened
    pub kind: NotificationKind,
    /// Execution the event concerns
    pub execution_id: Uuid,
    /// Zone the execution runs in
    pub zone_id: Uuid,
    /// Owner to notify
    pub owner_id: Uuid,
    /// Short headline
    pub title: String,
    /// Full message body
    pub message: String,
}

/// Delivers notification events to the alerting layer
#[async_trait]
pub trait NotificationAdapter: Send + Sync {
    /// Deliver one event
    async fn notify(&self, event: NotificationEvent) -> Result<()>;
}

/// Equipment adapter that logs commands instead of driving hardware.
///
/// Default wiring for the CLI and for environments with no actuation bus.
#[derive(Debug, Default)]
pub struct LoggingEquipmentAdapter;

#[async_trait]
impl EquipmentAdapter for LoggingEquipmentAdapter {
    async fn dispatch(&self, command: EquipmentCommand) -> Result<()> {
        tracing::info!(
            zone_id = %command.zone_id,
            device = ?command.device,
            command = ?command.command,
            value = ?command.value,
            mode = ?command.mode,
            "Equipment command dispatched"
        );
        Ok(())
    }
}

/// Notification adapter that logs events instead of delivering them
#[derive(Debug, Default)]
pub struct LoggingNotificationAdapter;

#[async_trait]
impl NotificationAdapter for LoggingNotificationAdapter {
    async fn notify(&self, event: NotificationEvent) -> Result<()> {
        tracing::info!(
            kind = ?event.kind,
            execution_id = %event.execution_id,
            zone_id = %event.zone_id,
            title = %event.title,
            message = %event.message,
            "Notification emitted"
        );
        Ok(())
    }
}
