//! Periodic sweep over live executions.
//!
//! Time-driven counterpart of the user-facing API: on every tick the sweeper
//! evaluates each active or waiting execution against its recipe so stage
//! thresholds are noticed without user interaction.

use crate::execution::service::ExecutionService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default interval between sweep runs
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Default ceiling on one execution's evaluation
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Periodic sweeper over live recipe executions
pub struct Sweeper {
    /// Execution service driving the evaluations
    service: Arc<ExecutionService>,
    /// Ceiling on a single execution's evaluation
    item_timeout: Duration,
}

impl Sweeper {
    /// Create a sweeper with the default per-item timeout
    pub fn new(service: Arc<ExecutionService>) -> Self {
        Self {
            service,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }

    /// Override the per-item evaluation timeout
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Evaluate every live execution once.
    ///
    /// One execution failing or timing out never stops the sweep of the
    /// rest; failures are logged per item. Returns the number of executions
    /// evaluated.
    pub async fn run_once(&self) -> usize {
        let candidates = self.service.store().sweepable_executions();
        tracing::info!(count = candidates.len(), "Checking live recipe executions");

        let mut evaluated = 0;
        for execution in candidates {
            match tokio::time::timeout(self.item_timeout, self.service.evaluate(execution.id)).await
            {
                Ok(Ok(())) => evaluated += 1,
                Ok(Err(error)) => {
                    tracing::error!(
                        execution_id = %execution.id,
                        %error,
                        "Sweep evaluation failed"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        execution_id = %execution.id,
                        timeout = ?self.item_timeout,
                        "Sweep evaluation timed out"
                    );
                }
            }
        }

        tracing::info!(evaluated, "Recipe execution check complete");
        evaluated
    }

    /// Spawn the sweep loop on the given interval.
    ///
    /// The first tick fires after one full interval; abort the handle to
    /// stop the loop.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval's first tick completes immediately; consume it so the
            // loop waits a full period before the first sweep
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
