//! Execution state persistence using JSON file storage

use crate::execution::error::{ExecutionError, ExecutionResult};
use crate::models::execution::{ExecutionStatus, RecipeExecution};
use crate::models::recipe::Recipe;
use crate::models::zone::Zone;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Root JSON store containing all farm execution data
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JsonStore {
    /// All growing zones
    pub zones: Vec<Zone>,
    /// All crop recipes
    pub recipes: Vec<Recipe>,
    /// All recipe executions, live and finished
    pub executions: Vec<RecipeExecution>,
}

/// Execution persistence manager.
///
/// All mutation happens under the in-memory mutex, so the one-live-execution-
/// per-zone check in `create_execution` and the closure in `update_execution`
/// are atomic with respect to each other.
pub struct ExecutionStore {
    /// Path to JSON store file
    store_path: PathBuf,
    /// In-memory data store
    store: Arc<Mutex<JsonStore>>,
}

impl ExecutionStore {
    /// Create new store, loading existing state from disk if present
    pub fn new<P: AsRef<Path>>(store_path: P) -> Result<Self> {
        let store_path = store_path.as_ref().to_path_buf();

        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }

        let store = if store_path.exists() {
            Self::load_store(&store_path)?
        } else {
            JsonStore::default()
        };

        Ok(Self {
            store_path,
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Load JSON store from file with file locking
    fn load_store(path: &Path) -> Result<JsonStore> {
        let file = File::open(path).context("Failed to open store file")?;

        // Shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on store")?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(file);
        reader
            .read_to_string(&mut contents)
            .context("Failed to read store")?;

        // Lock released when the reader goes out of scope
        drop(reader);

        if contents.is_empty() {
            return Ok(JsonStore::default());
        }

        serde_json::from_str(&contents).context("Failed to parse store JSON")
    }

    /// Save JSON store to file with file locking
    fn save_store(&self) -> Result<()> {
        let store = self.store.lock().unwrap();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.store_path)
            .context("Failed to open store file for writing")?;

        // Exclusive lock for writing
        file.lock_exclusive()
            .context("Failed to acquire write lock on store")?;

        let json = serde_json::to_string_pretty(&*store).context("Failed to serialize store")?;

        let mut writer = std::io::BufWriter::new(file);
        writer
            .write_all(json.as_bytes())
            .context("Failed to write store")?;
        writer.flush().context("Failed to flush store to disk")?;

        Ok(())
    }

    /// Create a new zone
    pub fn create_zone(&self, zone: Zone) -> Result<()> {
        {
            let mut store = self.store.lock().unwrap();
            store.zones.push(zone);
        }
        self.save_store()
    }

    /// Get zone by ID
    pub fn get_zone(&self, zone_id: Uuid) -> Option<Zone> {
        let store = self.store.lock().unwrap();
        store.zones.iter().find(|z| z.id == zone_id).cloned()
    }

    /// List all zones
    pub fn list_zones(&self) -> Vec<Zone> {
        let store = self.store.lock().unwrap();
        store.zones.clone()
    }

    /// Update the zone's denormalized active-recipe view
    pub fn mark_active_recipe(
        &self,
        zone_id: Uuid,
        recipe_id: Option<Uuid>,
        stage_index: Option<usize>,
    ) -> ExecutionResult<()> {
        {
            let mut store = self.store.lock().unwrap();
            let zone = store
                .zones
                .iter_mut()
                .find(|z| z.id == zone_id)
                .ok_or(ExecutionError::ZoneNotFound(zone_id))?;
            zone.active_recipe_id = recipe_id;
            zone.current_stage_index = stage_index;
        }
        self.save_store()?;
        Ok(())
    }

    /// Create a new recipe
    pub fn create_recipe(&self, recipe: Recipe) -> Result<()> {
        {
            let mut store = self.store.lock().unwrap();
            store.recipes.push(recipe);
        }
        self.save_store()
    }

    /// Get recipe by ID
    pub fn get_recipe(&self, recipe_id: Uuid) -> Option<Recipe> {
        let store = self.store.lock().unwrap();
        store.recipes.iter().find(|r| r.id == recipe_id).cloned()
    }

    /// List all recipes
    pub fn list_recipes(&self) -> Vec<Recipe> {
        let store = self.store.lock().unwrap();
        store.recipes.clone()
    }

    /// Create a new execution, enforcing one live execution per zone.
    ///
    /// The check and the insert happen under the same lock, so of two
    /// concurrent creates for one zone exactly one succeeds.
    pub fn create_execution(&self, execution: RecipeExecution) -> ExecutionResult<()> {
        {
            let mut store = self.store.lock().unwrap();
            if store
                .executions
                .iter()
                .any(|e| e.zone_id == execution.zone_id && e.status.is_live())
            {
                return Err(ExecutionError::ZoneBusy(execution.zone_id));
            }
            store.executions.push(execution);
        }
        self.save_store()?;
        Ok(())
    }

    /// Get execution by ID
    pub fn get_execution(&self, execution_id: Uuid) -> Option<RecipeExecution> {
        let store = self.store.lock().unwrap();
        store
            .executions
            .iter()
            .find(|e| e.id == execution_id)
            .cloned()
    }

    /// Get the live execution occupying a zone, if any
    pub fn live_execution_for_zone(&self, zone_id: Uuid) -> Option<RecipeExecution> {
        let store = self.store.lock().unwrap();
        store
            .executions
            .iter()
            .find(|e| e.zone_id == zone_id && e.status.is_live())
            .cloned()
    }

    /// Executions the periodic sweep should evaluate
    pub fn sweepable_executions(&self) -> Vec<RecipeExecution> {
        let store = self.store.lock().unwrap();
        store
            .executions
            .iter()
            .filter(|e| {
                matches!(
                    e.status,
                    ExecutionStatus::Active | ExecutionStatus::WaitingApproval
                )
            })
            .cloned()
            .collect()
    }

    /// List executions, optionally filtered by zone and status
    pub fn list_executions(
        &self,
        zone_id: Option<Uuid>,
        status: Option<ExecutionStatus>,
    ) -> Vec<RecipeExecution> {
        let store = self.store.lock().unwrap();
        store
            .executions
            .iter()
            .filter(|e| zone_id.is_none_or(|z| e.zone_id == z))
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect()
    }

    /// Apply a transition to one execution under the store lock.
    ///
    /// The closure mutates a scratch copy; only a successful closure commits,
    /// so a failed precondition leaves the execution exactly as it was.
    /// Because the closure runs under the same mutex as every other mutation,
    /// no two transitions interleave on the same execution.
    pub fn update_execution<F>(
        &self,
        execution_id: Uuid,
        transition: F,
    ) -> ExecutionResult<RecipeExecution>
    where
        F: FnOnce(&mut RecipeExecution) -> ExecutionResult<()>,
    {
        let updated = {
            let mut store = self.store.lock().unwrap();
            let execution = store
                .executions
                .iter_mut()
                .find(|e| e.id == execution_id)
                .ok_or(ExecutionError::ExecutionNotFound(execution_id))?;
            let mut scratch = execution.clone();
            transition(&mut scratch)?;
            *execution = scratch;
            execution.clone()
        };
        self.save_store()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample_execution(zone_id: Uuid) -> RecipeExecution {
        let now = Utc::now();
        RecipeExecution {
            id: Uuid::new_v4(),
            zone_id,
            recipe_id: Uuid::new_v4(),
            batch_number: None,
            current_stage_index: 0,
            status: ExecutionStatus::Active,
            started_at: now,
            current_stage_started_at: now,
            stage_history: vec![],
            pending_approval: None,
            approval_requested_at: None,
            completed_at: None,
            auto_environment_control: true,
            owner_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_store_initialization() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("farm.json");

        let store = ExecutionStore::new(&store_path).unwrap();
        assert!(store_path.parent().unwrap().exists());
        assert!(store.list_zones().is_empty());
    }

    #[test]
    fn test_create_execution_enforces_one_live_per_zone() {
        let dir = tempdir().unwrap();
        let store = ExecutionStore::new(dir.path().join("farm.json")).unwrap();

        let zone_id = Uuid::new_v4();
        store.create_execution(sample_execution(zone_id)).unwrap();

        let err = store
            .create_execution(sample_execution(zone_id))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::ZoneBusy(z) if z == zone_id));

        // A finished execution frees the zone
        let live = store.live_execution_for_zone(zone_id).unwrap();
        store
            .update_execution(live.id, |e| {
                e.status = ExecutionStatus::Aborted;
                Ok(())
            })
            .unwrap();
        store.create_execution(sample_execution(zone_id)).unwrap();
    }

    #[test]
    fn test_update_execution_failure_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let store = ExecutionStore::new(dir.path().join("farm.json")).unwrap();

        let execution = sample_execution(Uuid::new_v4());
        let id = execution.id;
        store.create_execution(execution).unwrap();

        let result = store.update_execution(id, |e| {
            e.status = ExecutionStatus::Paused;
            Err(ExecutionError::InvalidTransition("test".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(
            store.get_execution(id).unwrap().status,
            ExecutionStatus::Active
        );

        let missing = store.update_execution(Uuid::new_v4(), |_| Ok(()));
        assert!(matches!(
            missing.unwrap_err(),
            ExecutionError::ExecutionNotFound(_)
        ));
    }

    #[test]
    fn test_store_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("farm.json");

        let zone = Zone::new("Grow Room A", Uuid::new_v4());
        let zone_id = zone.id;
        {
            let store = ExecutionStore::new(&path).unwrap();
            store.create_zone(zone).unwrap();
            store.create_execution(sample_execution(zone_id)).unwrap();
        }

        let reopened = ExecutionStore::new(&path).unwrap();
        assert_eq!(reopened.get_zone(zone_id).unwrap().name, "Grow Room A");
        assert!(reopened.live_execution_for_zone(zone_id).is_some());
    }
}
