//! Command handlers

use crate::cli::config::CliConfig;
use crate::cli::execution::ExecutionCommands;
use anyhow::{bail, Context as _, Result};
use cropflow_core::clock::SystemClock;
use cropflow_core::execution::{
    ApprovalDecision, ExecutionService, ExecutionStore, LoggingEquipmentAdapter,
    LoggingNotificationAdapter, ServiceConfig, Sweeper,
};
use cropflow_core::models::{ExecutionStatus, Recipe, RecipeExecution, Stage, Zone};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shared handler context: config plus a wired execution service
pub struct Context {
    pub config: CliConfig,
    pub service: Arc<ExecutionService>,
}

impl Context {
    /// Load config and build the service over the JSON store
    pub fn load(store_override: Option<PathBuf>) -> Result<Self> {
        let config = CliConfig::load_or_init()?;
        let store_path = store_override.unwrap_or_else(|| config.store_path.clone());
        let store = Arc::new(ExecutionStore::new(store_path)?);

        let service = Arc::new(ExecutionService::new(
            store,
            Arc::new(LoggingEquipmentAdapter),
            Arc::new(LoggingNotificationAdapter),
            Arc::new(SystemClock),
            ServiceConfig {
                enforce_manual_tasks: config.enforce_manual_tasks,
            },
        ));

        Ok(Self { config, service })
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid {what} ID: {value}"))
}

fn parse_status(value: &str) -> Result<ExecutionStatus> {
    match value {
        "active" => Ok(ExecutionStatus::Active),
        "paused" => Ok(ExecutionStatus::Paused),
        "waiting_approval" => Ok(ExecutionStatus::WaitingApproval),
        "completed" => Ok(ExecutionStatus::Completed),
        "aborted" => Ok(ExecutionStatus::Aborted),
        other => bail!("Unknown status: {other}"),
    }
}

fn print_execution(execution: &RecipeExecution, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(execution)?);
    } else {
        println!("Execution {}", execution.id);
        println!("  zone:    {}", execution.zone_id);
        println!("  recipe:  {}", execution.recipe_id);
        if let Some(batch) = &execution.batch_number {
            println!("  batch:   {batch}");
        }
        println!("  status:  {:?}", execution.status);
        println!("  stage:   {}", execution.current_stage_index);
        println!("  started: {}", execution.started_at);
        if let Some(pending) = &execution.pending_approval {
            println!(
                "  pending approval: {} (day {}, expected {}-{})",
                pending.stage_name,
                pending.days_in_stage,
                pending.min_duration_days,
                pending.max_duration_days
            );
            for task in &pending.manual_tasks {
                println!("    task: {task}");
            }
        }
        println!("  completed stages: {}", execution.stage_history.len());
    }
    Ok(())
}

pub fn zone_add(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let zone = Zone::new(name, ctx.config.operator_id);
    ctx.service.store().create_zone(zone.clone())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&zone)?);
    } else {
        println!("Zone '{}' registered with ID {}", zone.name, zone.id);
    }
    Ok(())
}

pub fn zone_list(ctx: &Context, json: bool) -> Result<()> {
    let zones = ctx.service.store().list_zones();
    if json {
        println!("{}", serde_json::to_string_pretty(&zones)?);
    } else if zones.is_empty() {
        println!("No zones registered");
    } else {
        for zone in zones {
            let occupancy = match zone.active_recipe_id {
                Some(recipe_id) => format!("running recipe {recipe_id}"),
                None => "idle".to_string(),
            };
            println!("{}  {}  ({occupancy})", zone.id, zone.name);
        }
    }
    Ok(())
}

/// On-disk recipe definition loaded by `recipe add`
#[derive(Debug, Deserialize)]
struct RecipeFile {
    crop_name: String,
    #[serde(default)]
    description: Option<String>,
    stages: Vec<Stage>,
}

pub fn recipe_add(ctx: &Context, file: &Path, json: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let definition: RecipeFile = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let recipe = Recipe {
        id: Uuid::new_v4(),
        crop_name: definition.crop_name,
        description: definition.description,
        stages: definition.stages,
    };
    if let Err(reason) = recipe.validate() {
        bail!("Invalid recipe: {reason}");
    }

    ctx.service.store().create_recipe(recipe.clone())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        println!(
            "Recipe '{}' registered with ID {} ({} stages, {} days)",
            recipe.crop_name,
            recipe.id,
            recipe.stages.len(),
            recipe.total_duration_days()
        );
    }
    Ok(())
}

pub fn recipe_list(ctx: &Context, json: bool) -> Result<()> {
    let recipes = ctx.service.store().list_recipes();
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else if recipes.is_empty() {
        println!("No recipes registered");
    } else {
        for recipe in recipes {
            println!(
                "{}  {}  ({} stages, {} days)",
                recipe.id,
                recipe.crop_name,
                recipe.stages.len(),
                recipe.total_duration_days()
            );
        }
    }
    Ok(())
}

pub async fn handle_execution(ctx: &Context, command: ExecutionCommands) -> Result<()> {
    match command {
        ExecutionCommands::Start {
            zone_id,
            recipe_id,
            batch,
            json,
        } => {
            let zone_id = parse_uuid(&zone_id, "zone")?;
            let recipe_id = parse_uuid(&recipe_id, "recipe")?;
            let execution = ctx
                .service
                .start(zone_id, recipe_id, batch, ctx.config.operator_id)
                .await?;
            print_execution(&execution, json)
        }
        ExecutionCommands::Status { execution_id, json } => {
            let execution = ctx.service.get(parse_uuid(&execution_id, "execution")?)?;
            print_execution(&execution, json)
        }
        ExecutionCommands::List { zone, status, json } => {
            let zone = zone.as_deref().map(|z| parse_uuid(z, "zone")).transpose()?;
            let status = status.as_deref().map(parse_status).transpose()?;
            let executions = ctx.service.list(zone, status);
            if json {
                println!("{}", serde_json::to_string_pretty(&executions)?);
            } else if executions.is_empty() {
                println!("No executions found");
            } else {
                for execution in executions {
                    println!(
                        "{}  zone {}  stage {}  {:?}",
                        execution.id,
                        execution.zone_id,
                        execution.current_stage_index,
                        execution.status
                    );
                }
            }
            Ok(())
        }
        ExecutionCommands::Approve {
            execution_id,
            notes,
            tasks_done,
            json,
        } => {
            let execution = ctx
                .service
                .decide(
                    parse_uuid(&execution_id, "execution")?,
                    ctx.config.operator_id,
                    ApprovalDecision {
                        approved: true,
                        notes,
                        manual_tasks_completed: tasks_done,
                    },
                )
                .await?;
            print_execution(&execution, json)
        }
        ExecutionCommands::Decline {
            execution_id,
            notes,
            json,
        } => {
            let execution = ctx
                .service
                .decide(
                    parse_uuid(&execution_id, "execution")?,
                    ctx.config.operator_id,
                    ApprovalDecision {
                        approved: false,
                        notes,
                        manual_tasks_completed: false,
                    },
                )
                .await?;
            print_execution(&execution, json)
        }
        ExecutionCommands::Pause { execution_id, json } => {
            let execution = ctx
                .service
                .pause(parse_uuid(&execution_id, "execution")?)
                .await?;
            print_execution(&execution, json)
        }
        ExecutionCommands::Resume { execution_id, json } => {
            let execution = ctx
                .service
                .resume(parse_uuid(&execution_id, "execution")?)
                .await?;
            print_execution(&execution, json)
        }
        ExecutionCommands::Abort { execution_id, json } => {
            let execution = ctx
                .service
                .abort(parse_uuid(&execution_id, "execution")?)
                .await?;
            print_execution(&execution, json)
        }
        ExecutionCommands::Progress { execution_id, json } => {
            let progress = ctx
                .service
                .progress(parse_uuid(&execution_id, "execution")?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                println!(
                    "{}: stage {}/{} ('{}'), day {} in stage, {}% complete",
                    progress.crop_name,
                    progress.execution.current_stage_index + 1,
                    progress.total_stages,
                    progress.stage_name,
                    progress.days_in_current_stage,
                    progress.progress_percent
                );
            }
            Ok(())
        }
    }
}

pub async fn sweep(ctx: &Context, watch: bool, json: bool) -> Result<()> {
    let sweeper = Sweeper::new(ctx.service.clone());

    if watch {
        let interval = Duration::from_secs(ctx.config.sweep_interval_minutes * 60);
        println!(
            "Sweeping every {} minutes (Ctrl-C to stop)",
            ctx.config.sweep_interval_minutes
        );
        sweeper.run_once().await;
        let handle = sweeper.spawn(interval);
        handle.await?;
        return Ok(());
    }

    let evaluated = sweeper.run_once().await;
    if json {
        println!("{}", serde_json::json!({ "evaluated": evaluated }));
    } else {
        println!("Evaluated {evaluated} live executions");
    }
    Ok(())
}
