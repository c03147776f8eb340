//! Execution CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ExecutionCommands {
    /// Start executing a recipe in a zone
    Start {
        /// Zone ID (UUID)
        zone_id: String,

        /// Recipe ID (UUID)
        recipe_id: String,

        /// Associated batch number
        #[arg(short, long)]
        batch: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one execution
    Status {
        /// Execution ID (UUID)
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List executions
    List {
        /// Filter by zone ID (UUID)
        #[arg(long)]
        zone: Option<String>,

        /// Filter by status (active, paused, waiting_approval, completed, aborted)
        #[arg(long)]
        status: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Approve the pending stage transition
    Approve {
        /// Execution ID (UUID)
        execution_id: String,

        /// Operator notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Confirm the stage's manual tasks were done
        #[arg(long)]
        tasks_done: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Decline the pending stage transition, extending the stage
    Decline {
        /// Execution ID (UUID)
        execution_id: String,

        /// Operator notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Pause an active execution
    Pause {
        /// Execution ID (UUID)
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Resume a paused execution
    Resume {
        /// Execution ID (UUID)
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Abort an execution before completion
    Abort {
        /// Execution ID (UUID)
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show progress through the recipe
    Progress {
        /// Execution ID (UUID)
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
