//! Ingestion of creation events

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_api::{ConfirmationStatus, CreationEvent, IngestOutcome, ServiceRecord};
use warden_store::{AuditEvent, AuditEventType, LifecycleStore, StoreError};

use crate::{CoreEvent, CoreResult, Publisher, TokenIssuer};

/// Placeholder for creator and locator fields the event did not carry
pub const NOT_AVAILABLE: &str = "N/A";

/// Opens a Pending record per newly created resource and sends the
/// initial confirmation request
pub struct Ingestor {
    store: Arc<dyn LifecycleStore>,
    issuer: TokenIssuer,
    publisher: Arc<Publisher>,
    validity: chrono::Duration,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        issuer: TokenIssuer,
        publisher: Arc<Publisher>,
        validity: chrono::Duration,
    ) -> Self {
        Self {
            store,
            issuer,
            publisher,
            validity,
        }
    }

    /// Ingest one normalized creation event.
    ///
    /// A record is created at most once per service id; a repeated event
    /// leaves the existing record and its token untouched and sends
    /// nothing.
    pub async fn ingest(&self, event: &CreationEvent, now: DateTime<Utc>) -> CoreResult<IngestOutcome> {
        let Some(service_id) = event.service_id() else {
            warn!(resource_type = %event.resource_type, "Creation event without resource id, skipping");
            return Ok(IngestOutcome::Skipped {
                reason: "missing resourceId".into(),
            });
        };

        let issued = self.issuer.issue(now, self.validity)?;

        let record = ServiceRecord {
            service_id: service_id.clone(),
            resource_type: event.resource_type.clone(),
            resource_locator: non_blank(&event.resource_locator),
            creator_identity: non_blank(&event.creator_identity),
            creator_name: non_blank(&event.creator_name),
            creation_timestamp: event.creation_time.unwrap_or(now),
            account: event.account_context.clone(),
            status: ConfirmationStatus::Pending,
            confirmation_token: issued.token,
            confirmation_token_expiry: issued.expiry,
            last_notification_sent: Some(now),
            last_action_time: None,
            last_action_message: None,
            confirmed_at: None,
        };

        match self.store.create_if_absent(&record) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => {
                debug!(service_id = %service_id, "Duplicate creation event ignored");
                let _ = self.store.append_audit(AuditEvent::new(
                    now,
                    AuditEventType::DuplicateIgnored {
                        service_id: service_id.clone(),
                    },
                ));
                return Ok(IngestOutcome::Duplicate { service_id });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            service_id = %service_id,
            resource_type = %record.resource_type,
            expires_at = %record.confirmation_token_expiry,
            "Service record created"
        );

        let _ = self.store.append_audit(AuditEvent::new(
            now,
            AuditEventType::RecordCreated {
                service_id: service_id.clone(),
                resource_type: record.resource_type.clone(),
                expires_at: record.confirmation_token_expiry,
            },
        ));

        let expires_at = record.confirmation_token_expiry;
        self.publisher.publish(&CoreEvent::RecordCreated { record }).await;

        Ok(IngestOutcome::Created {
            service_id,
            expires_at,
        })
    }
}

fn non_blank(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::t0;
    use crate::{CoreError, TokenError};
    use warden_api::{AccountContext, ResourceType};
    use warden_controller_api::RecordingNotifier;
    use warden_store::SqliteStore;
    use warden_util::ServiceId;

    fn setup() -> (Arc<SqliteStore>, Arc<RecordingNotifier>, Ingestor) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let publisher = Arc::new(Publisher::new(notifier.clone(), "https://warden.example.com"));
        let ingestor = Ingestor::new(
            store.clone(),
            TokenIssuer::new(),
            publisher,
            chrono::Duration::hours(1),
        );
        (store, notifier, ingestor)
    }

    fn event(id: Option<&str>) -> CreationEvent {
        CreationEvent {
            resource_type: ResourceType::ComputeInstance,
            resource_id: id.map(String::from),
            creator_identity: Some("arn:aws:iam::123456789012:user/alice".into()),
            creator_name: Some("alice".into()),
            creation_time: Some(t0()),
            resource_locator: None,
            account_context: AccountContext {
                account_id: Some("123456789012".into()),
                region: Some("ap-south-1".into()),
            },
        }
    }

    #[tokio::test]
    async fn creates_pending_record_and_notifies() {
        let (store, notifier, ingestor) = setup();

        let outcome = ingestor.ingest(&event(Some("i-123")), t0()).await.unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Created {
                service_id: ServiceId::new("i-123"),
                expires_at: t0() + chrono::Duration::hours(1),
            }
        );

        let stored = store.get(&ServiceId::new("i-123")).unwrap().unwrap();
        assert_eq!(stored.status, ConfirmationStatus::Pending);
        assert_eq!(stored.last_notification_sent, Some(t0()));
        assert_eq!(stored.resource_locator, NOT_AVAILABLE);
        assert_eq!(stored.creator_name, "alice");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "ACTION REQUIRED: New EC2 Instance Created - i-123");
        assert!(sent[0].body.contains(&stored.confirmation_token));
    }

    #[tokio::test]
    async fn duplicate_event_changes_nothing() {
        let (store, notifier, ingestor) = setup();
        ingestor.ingest(&event(Some("i-123")), t0()).await.unwrap();
        let first = store.get(&ServiceId::new("i-123")).unwrap().unwrap();

        let later = t0() + chrono::Duration::minutes(5);
        let outcome = ingestor.ingest(&event(Some("i-123")), later).await.unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::Duplicate {
                service_id: ServiceId::new("i-123")
            }
        );
        assert_eq!(store.get(&ServiceId::new("i-123")).unwrap().unwrap(), first);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn missing_id_is_skipped() {
        let (store, notifier, ingestor) = setup();

        for id in [None, Some(""), Some("   ")] {
            let outcome = ingestor.ingest(&event(id), t0()).await.unwrap();
            assert!(matches!(outcome, IngestOutcome::Skipped { .. }));
        }

        assert!(store.scan_by_status(ConfirmationStatus::Pending).unwrap().is_empty());
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn defaults_for_missing_fields() {
        let (store, _notifier, ingestor) = setup();
        let bare = CreationEvent {
            resource_type: ResourceType::StorageBucket,
            resource_id: Some("my-bucket".into()),
            creator_identity: None,
            creator_name: None,
            creation_time: None,
            resource_locator: None,
            account_context: AccountContext::default(),
        };

        ingestor.ingest(&bare, t0()).await.unwrap();

        let stored = store.get(&ServiceId::new("my-bucket")).unwrap().unwrap();
        assert_eq!(stored.creator_identity, NOT_AVAILABLE);
        assert_eq!(stored.creator_name, NOT_AVAILABLE);
        assert_eq!(stored.creation_timestamp, t0());
    }

    #[tokio::test]
    async fn unrepresentable_expiry_fails_without_a_record() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let publisher = Arc::new(Publisher::new(notifier.clone(), "https://warden.example.com"));
        let ingestor = Ingestor::new(store.clone(), TokenIssuer::new(), publisher, chrono::Duration::MAX);

        let result = ingestor.ingest(&event(Some("i-123")), t0()).await;

        assert!(matches!(result, Err(CoreError::Token(TokenError::ExpiryOutOfRange { .. }))));
        assert!(store.get(&ServiceId::new("i-123")).unwrap().is_none());
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn notification_failure_keeps_record() {
        let (store, notifier, ingestor) = setup();
        notifier.set_fail_send(true);

        let outcome = ingestor.ingest(&event(Some("i-123")), t0()).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Created { .. }));
        assert!(store.get(&ServiceId::new("i-123")).unwrap().is_some());
    }
}
