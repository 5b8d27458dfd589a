//! Integration tests for wardend
//!
//! These tests drive the wired-up core end to end: ingestion, the
//! confirmation link, and enforcement ticks against a manual clock.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use warden_api::{ConfirmOutcome, ConfirmationStatus, CreationEvent, IngestOutcome, ResourceType};
use warden_config::{Policy, parse_config};
use warden_controller_api::{
    ControllerResult, MockController, RecordingNotifier, ResourceController,
};
use warden_core::WardenCore;
use warden_store::{LifecycleStore, SqliteStore};
use warden_util::{Clock, ManualClock, ServiceId};

/// 12:45 UTC, so T0+20 (13:05) is outside the :30 phase and T0+45 (13:30)
/// and T0+70 (13:55) are inside it
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 29, 12, 45, 0).unwrap()
}

fn minutes(m: i64) -> chrono::Duration {
    chrono::Duration::minutes(m)
}

struct Harness {
    core: WardenCore,
    store: Arc<SqliteStore>,
    controller: Arc<MockController>,
    notifier: Arc<RecordingNotifier>,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_controller_and_store(
            Arc::new(MockController::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
        )
    }

    fn with_controller_and_store(controller: Arc<MockController>, store: Arc<SqliteStore>) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let core = WardenCore::new(
            &Policy::default(),
            store.clone(),
            controller.clone(),
            notifier.clone(),
        );
        Self {
            core,
            store,
            controller,
            notifier,
            clock: ManualClock::new(t0()),
        }
    }

    async fn ingest(&self, resource_type: &str, id: &str) -> IngestOutcome {
        let event: CreationEvent = serde_json::from_value(serde_json::json!({
            "resourceType": resource_type,
            "resourceId": id,
            "creatorIdentity": "arn:aws:iam::123456789012:user/alice",
            "creatorName": "alice",
            "accountContext": { "accountId": "123456789012", "region": "ap-south-1" }
        }))
        .unwrap();
        self.core.ingestor.ingest(&event, self.clock.now()).await.unwrap()
    }

    fn record(&self, id: &str) -> warden_api::ServiceRecord {
        self.store.get(&ServiceId::new(id)).unwrap().unwrap()
    }

    fn confirm(&self, id: &str, token: &str) -> ConfirmOutcome {
        self.core
            .confirmations
            .confirm(&ServiceId::new(id), token, self.clock.now())
            .unwrap()
    }

    async fn tick_at(&self, offset: chrono::Duration) -> warden_api::TickSummary {
        self.clock.set(t0() + offset);
        self.core.scheduler.tick(self.clock.now()).await.unwrap()
    }
}

#[tokio::test]
async fn scenario_a_compute_instance_reminded_then_stopped() {
    let h = Harness::new();
    assert!(matches!(
        h.ingest("EC2 Instance", "i-123").await,
        IngestOutcome::Created { .. }
    ));
    assert_eq!(h.notifier.with_prefix("ACTION REQUIRED").len(), 1);

    // T0+20: outside the window, nothing happens
    let summary = h.tick_at(minutes(20)).await;
    assert!(!summary.in_window);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.record("i-123").last_notification_sent, Some(t0()));

    // T0+45: not expired, reminder due
    let summary = h.tick_at(minutes(45)).await;
    assert!(summary.in_window);
    assert_eq!(summary.reminders_sent, 1);
    assert_eq!(summary.actions_taken, 0);
    assert_eq!(h.notifier.with_prefix("REMINDER: Confirm Your EC2 Instance - i-123").len(), 1);
    assert_eq!(h.record("i-123").last_notification_sent, Some(t0() + minutes(45)));

    // T0+70: expired, stopped
    let summary = h.tick_at(minutes(70)).await;
    assert_eq!(summary.actions_taken, 1);

    let record = h.record("i-123");
    assert_eq!(record.status, ConfirmationStatus::Stopped);
    assert_eq!(record.last_action_time, Some(t0() + minutes(70)));
    assert_eq!(h.controller.mutation_count(), 1);
    assert_eq!(
        h.notifier.with_prefix("Service Action: Stopped - EC2 Instance i-123").len(),
        1
    );

    // The consumed token is refused afterwards
    assert_eq!(
        h.confirm("i-123", &record.confirmation_token),
        ConfirmOutcome::Expired
    );
}

#[tokio::test]
async fn scenario_b_non_empty_bucket_is_never_deleted() {
    let controller = Arc::new(MockController::new());
    controller.set_non_empty("my-bucket");
    let h = Harness::with_controller_and_store(controller, Arc::new(SqliteStore::in_memory().unwrap()));

    h.ingest("S3 Bucket", "my-bucket").await;
    h.tick_at(minutes(105)).await;

    assert_eq!(h.record("my-bucket").status, ConfirmationStatus::SkippedNotEmpty);
    assert_eq!(h.controller.mutation_count(), 0);
    assert_eq!(h.notifier.with_prefix("Service Action: Skipped_Not_Empty").len(), 1);
}

#[tokio::test]
async fn scenario_c_unsupported_type_is_skipped() {
    let h = Harness::new();

    h.ingest("Unknown-Service", "thing-1").await;
    h.tick_at(minutes(105)).await;

    let record = h.record("thing-1");
    assert_eq!(record.status, ConfirmationStatus::SkippedUnsupportedType);
    assert_eq!(record.resource_type, ResourceType::Unsupported("Unknown-Service".into()));
    assert!(h.controller.calls().is_empty());
}

#[tokio::test]
async fn confirmed_resource_is_left_alone() {
    let h = Harness::new();
    h.ingest("Lambda Function", "fn-1").await;
    let token = h.record("fn-1").confirmation_token;

    h.clock.set(t0() + minutes(10));
    assert_eq!(h.confirm("fn-1", &token), ConfirmOutcome::Confirmed);
    assert_eq!(h.confirm("fn-1", &token), ConfirmOutcome::AlreadyConfirmed);

    let summary = h.tick_at(minutes(120)).await;
    assert_eq!(summary.records_processed, 0);
    assert_eq!(h.record("fn-1").status, ConfirmationStatus::Confirmed);
    assert!(h.controller.calls().is_empty());
}

#[tokio::test]
async fn expiry_wins_even_before_the_scheduler_runs() {
    let h = Harness::new();
    h.ingest("RDS DB Instance", "db-1").await;
    let token = h.record("db-1").confirmation_token;

    h.clock.set(t0() + minutes(61));
    assert_eq!(h.confirm("db-1", &token), ConfirmOutcome::Expired);
    assert_eq!(h.record("db-1").status, ConfirmationStatus::Pending);
}

#[tokio::test]
async fn wrong_token_is_forbidden_and_harmless() {
    let h = Harness::new();
    h.ingest("EC2 Instance", "i-123").await;
    let before = h.record("i-123");

    assert_eq!(h.confirm("i-123", "not-the-token"), ConfirmOutcome::Forbidden);
    assert_eq!(h.confirm("i-404", &before.confirmation_token), ConfirmOutcome::NotFound);
    assert_eq!(h.record("i-123"), before);
}

#[tokio::test]
async fn repeated_ingestion_is_idempotent() {
    let h = Harness::new();
    h.ingest("EC2 Instance", "i-123").await;
    let first = h.record("i-123");

    h.clock.set(t0() + minutes(5));
    assert!(matches!(
        h.ingest("EC2 Instance", "i-123").await,
        IngestOutcome::Duplicate { .. }
    ));

    assert_eq!(h.record("i-123"), first);
    assert_eq!(h.notifier.count(), 1);
}

/// Confirms the record while a stop call is in flight
struct ConfirmingController {
    store: Arc<SqliteStore>,
}

#[async_trait]
impl ResourceController for ConfirmingController {
    async fn stop(&self, _resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        self.store
            .conditional_update(
                id,
                ConfirmationStatus::Pending,
                &warden_api::RecordUpdate::confirmed(t0() + minutes(70)),
            )
            .unwrap();
        Ok(())
    }

    async fn delete(&self, _resource_type: &ResourceType, _id: &ServiceId) -> ControllerResult<()> {
        Ok(())
    }

    async fn is_empty(&self, _resource_type: &ResourceType, _id: &ServiceId) -> ControllerResult<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn confirmation_racing_enforcement_wins_cleanly() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let notifier = Arc::new(RecordingNotifier::new());
    let core = WardenCore::new(
        &Policy::default(),
        store.clone(),
        Arc::new(ConfirmingController {
            store: store.clone(),
        }),
        notifier.clone(),
    );

    let event: CreationEvent = serde_json::from_value(serde_json::json!({
        "resourceType": "EC2 Instance",
        "resourceId": "i-123"
    }))
    .unwrap();
    core.ingestor.ingest(&event, t0()).await.unwrap();

    let summary = core.scheduler.tick(t0() + minutes(70)).await.unwrap();

    assert_eq!(summary.actions_taken, 0);
    assert_eq!(summary.conflicts, 1);

    let record = store.get(&ServiceId::new("i-123")).unwrap().unwrap();
    assert_eq!(record.status, ConfirmationStatus::Confirmed);
    assert!(record.last_action_time.is_none());
    assert!(notifier.with_prefix("Service Action").is_empty());
}

/// Yields inside every call so overlapping ticks interleave
struct YieldingController(MockController);

#[async_trait]
impl ResourceController for YieldingController {
    async fn stop(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        tokio::task::yield_now().await;
        self.0.stop(resource_type, id).await
    }

    async fn delete(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        tokio::task::yield_now().await;
        self.0.delete(resource_type, id).await
    }

    async fn is_empty(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<bool> {
        tokio::task::yield_now().await;
        self.0.is_empty(resource_type, id).await
    }
}

#[tokio::test]
async fn overlapping_ticks_commit_once() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let notifier = Arc::new(RecordingNotifier::new());
    let core = WardenCore::new(
        &Policy::default(),
        store.clone(),
        Arc::new(YieldingController(MockController::new())),
        notifier.clone(),
    );

    let event: CreationEvent = serde_json::from_value(serde_json::json!({
        "resourceType": "EC2 Instance",
        "resourceId": "i-123"
    }))
    .unwrap();
    core.ingestor.ingest(&event, t0()).await.unwrap();

    let now = t0() + minutes(70);
    let (a, b) = tokio::join!(core.scheduler.tick(now), core.scheduler.tick(now));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.actions_taken + b.actions_taken, 1);
    assert_eq!(a.conflicts + b.conflicts, 1);
    assert_eq!(notifier.with_prefix("Service Action").len(), 1);
    assert_eq!(
        store.get(&ServiceId::new("i-123")).unwrap().unwrap().status,
        ConfirmationStatus::Stopped
    );
}

#[tokio::test]
async fn file_backed_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join(warden_util::DATABASE_FILENAME);

    {
        let h = Harness::with_controller_and_store(
            Arc::new(MockController::new()),
            Arc::new(SqliteStore::open(&db_path).unwrap()),
        );
        h.ingest("EC2 Instance", "i-123").await;
    }

    let h = Harness::with_controller_and_store(
        Arc::new(MockController::new()),
        Arc::new(SqliteStore::open(&db_path).unwrap()),
    );
    h.tick_at(minutes(70)).await;
    assert_eq!(h.record("i-123").status, ConfirmationStatus::Stopped);
}

#[test]
fn example_config_is_valid() {
    let content = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../config.example.toml"
    ))
    .unwrap();

    let policy = parse_config(&content).unwrap();
    assert!(
        policy
            .controller
            .commands_for(&ResourceType::StorageBucket)
            .is_some()
    );
}
