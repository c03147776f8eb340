mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::execution::ExecutionCommands;
use cli::handlers;
use cropflow_core::services::logging::{init_logging, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cropflow")]
#[command(version)]
#[command(about = "Crop recipe execution for farm operations")]
struct Cli {
    /// Path to the JSON store (overrides the config file)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage growing zones
    Zone {
        #[command(subcommand)]
        command: ZoneCommands,
    },

    /// Manage crop recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },

    /// Manage recipe executions
    Exec {
        #[command(subcommand)]
        command: ExecutionCommands,
    },

    /// Evaluate all live executions against their recipes
    Sweep {
        /// Keep sweeping on the configured interval instead of running once
        #[arg(long)]
        watch: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ZoneCommands {
    /// Register a new growing zone
    Add {
        /// Zone display name
        name: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List registered zones
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Load a recipe definition from a YAML file
    Add {
        /// Path to the recipe YAML file
        file: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List registered recipes
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "error" => LogLevel::Error,
        "warn" => LogLevel::Warn,
        "debug" => LogLevel::Debug,
        "trace" => LogLevel::Trace,
        _ => LogLevel::Info,
    };
    let _ = init_logging(level);

    let ctx = handlers::Context::load(cli.store)?;

    match cli.command {
        Commands::Zone { command } => match command {
            ZoneCommands::Add { name, json } => handlers::zone_add(&ctx, &name, json),
            ZoneCommands::List { json } => handlers::zone_list(&ctx, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Add { file, json } => handlers::recipe_add(&ctx, &file, json),
            RecipeCommands::List { json } => handlers::recipe_list(&ctx, json),
        },
        Commands::Exec { command } => handlers::handle_execution(&ctx, command).await,
        Commands::Sweep { watch, json } => handlers::sweep(&ctx, watch, json).await,
    }
}
