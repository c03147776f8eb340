//! Start preconditions and the one-live-execution-per-zone race

use chrono::Utc;
use cropflow_core::clock::{Clock, ManualClock};
use cropflow_core::execution::{
    ExecutionError, ExecutionService, ExecutionStore, LoggingEquipmentAdapter,
    LoggingNotificationAdapter, ServiceConfig,
};
use cropflow_core::models::{ExecutionStatus, Recipe, Stage, Zone};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn stage(name: &str, duration_days: u32) -> Stage {
    Stage {
        name: name.to_string(),
        duration_days,
        max_duration_days: None,
        environmental: None,
        lighting: None,
        irrigation: None,
        manual_tasks: vec![],
    }
}

fn service(dir: &TempDir) -> (Arc<ExecutionService>, Arc<ExecutionStore>) {
    let store = Arc::new(ExecutionStore::new(dir.path().join("farm.json")).unwrap());
    let clock = ManualClock::new(Utc::now());
    let service = Arc::new(ExecutionService::new(
        store.clone(),
        Arc::new(LoggingEquipmentAdapter),
        Arc::new(LoggingNotificationAdapter),
        Arc::new(clock) as Arc<dyn Clock>,
        ServiceConfig::default(),
    ));
    (service, store)
}

fn seed_zone_and_recipe(store: &ExecutionStore, owner: Uuid) -> (Uuid, Uuid) {
    let zone = Zone::new("Zone", owner);
    let zone_id = zone.id;
    store.create_zone(zone).unwrap();

    let recipe = Recipe {
        id: Uuid::new_v4(),
        crop_name: "Lettuce".to_string(),
        description: None,
        stages: vec![stage("seedling", 7), stage("harvest-ready", 14)],
    };
    let recipe_id = recipe.id;
    store.create_recipe(recipe).unwrap();
    (zone_id, recipe_id)
}

#[tokio::test]
async fn test_start_rejects_unknown_zone_and_recipe() {
    let dir = TempDir::new().unwrap();
    let (service, store) = service(&dir);
    let owner = Uuid::new_v4();
    let (zone_id, _recipe_id) = seed_zone_and_recipe(&store, owner);

    let err = service
        .start(Uuid::new_v4(), Uuid::new_v4(), None, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::ZoneNotFound(_)));

    let err = service
        .start(zone_id, Uuid::new_v4(), None, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::RecipeNotFound(_)));
}

#[tokio::test]
async fn test_start_rejects_recipe_without_stages() {
    let dir = TempDir::new().unwrap();
    let (service, store) = service(&dir);
    let owner = Uuid::new_v4();
    let (zone_id, _) = seed_zone_and_recipe(&store, owner);

    let empty = Recipe {
        id: Uuid::new_v4(),
        crop_name: "Empty".to_string(),
        description: None,
        stages: vec![],
    };
    let empty_id = empty.id;
    store.create_recipe(empty).unwrap();

    let err = service.start(zone_id, empty_id, None, owner).await.unwrap_err();
    assert!(matches!(err, ExecutionError::RecipeInvalid { .. }));
    assert!(store.live_execution_for_zone(zone_id).is_none());
}

#[tokio::test]
async fn test_start_on_busy_zone_fails() {
    let dir = TempDir::new().unwrap();
    let (service, store) = service(&dir);
    let owner = Uuid::new_v4();
    let (zone_id, recipe_id) = seed_zone_and_recipe(&store, owner);

    service.start(zone_id, recipe_id, None, owner).await.unwrap();
    let err = service
        .start(zone_id, recipe_id, None, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::ZoneBusy(z) if z == zone_id));

    // Paused executions still occupy the zone
    let live = store.live_execution_for_zone(zone_id).unwrap();
    service.pause(live.id).await.unwrap();
    let err = service
        .start(zone_id, recipe_id, None, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::ZoneBusy(_)));
}

#[tokio::test]
async fn test_concurrent_starts_yield_exactly_one_live_execution() {
    let dir = TempDir::new().unwrap();
    let (service, store) = service(&dir);
    let owner = Uuid::new_v4();
    let (zone_id, recipe_id) = seed_zone_and_recipe(&store, owner);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.start(zone_id, recipe_id, None, owner).await
        }));
    }

    let mut successes = 0;
    let mut busy = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ExecutionError::ZoneBusy(_)) => busy += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(busy, 7);
    assert_eq!(
        store
            .list_executions(Some(zone_id), None)
            .iter()
            .filter(|e| e.status.is_live())
            .count(),
        1
    );
}

#[tokio::test]
async fn test_two_zones_run_independently() {
    let dir = TempDir::new().unwrap();
    let (service, store) = service(&dir);
    let owner = Uuid::new_v4();
    let (zone_a, recipe_id) = seed_zone_and_recipe(&store, owner);

    let zone_b = Zone::new("Zone B", owner);
    let zone_b_id = zone_b.id;
    store.create_zone(zone_b).unwrap();

    let exec_a = service.start(zone_a, recipe_id, None, owner).await.unwrap();
    let exec_b = service
        .start(zone_b_id, recipe_id, None, owner)
        .await
        .unwrap();

    assert_ne!(exec_a.id, exec_b.id);
    service.abort(exec_a.id).await.unwrap();
    assert_eq!(
        service.get(exec_b.id).unwrap().status,
        ExecutionStatus::Active
    );
}
