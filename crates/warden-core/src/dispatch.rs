//! Per-resource-type enforcement

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use warden_api::{ConfirmationStatus, RecordUpdate, ResourceType, ServiceRecord};
use warden_controller_api::ResourceController;
use warden_store::{AuditEvent, AuditEventType, LifecycleStore, StoreError};

use crate::{CoreEvent, CoreResult};

/// What enforcement does to a resource of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementAction {
    /// Stop, keeping data
    Stop,
    /// Delete outright
    Delete,
    /// Delete only if the resource holds no data
    DeleteIfEmpty,
    /// Leave the resource alone and record why
    Skip,
}

impl EnforcementAction {
    pub fn for_type(resource_type: &ResourceType) -> Self {
        match resource_type {
            ResourceType::ComputeInstance => EnforcementAction::Stop,
            ResourceType::StorageBucket => EnforcementAction::DeleteIfEmpty,
            ResourceType::FunctionResource => EnforcementAction::Delete,
            ResourceType::ManagedDatabase => EnforcementAction::Stop,
            ResourceType::Unsupported(_) => EnforcementAction::Skip,
        }
    }
}

/// Result of dispatching one expired record
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// This dispatcher won the transition; the event still has to be
    /// published
    Committed(CoreEvent),
    /// Another writer settled the record first; nothing was written
    Conflict { current: ConfirmationStatus },
}

/// Executes the enforcement action for an expired Pending record and
/// commits the resulting terminal status
pub struct ActionDispatcher {
    store: Arc<dyn LifecycleStore>,
    controller: Arc<dyn ResourceController>,
}

impl ActionDispatcher {
    pub fn new(store: Arc<dyn LifecycleStore>, controller: Arc<dyn ResourceController>) -> Self {
        Self { store, controller }
    }

    /// Run the action, then commit status, time and message with a single
    /// conditional update expecting Pending.
    ///
    /// Controller errors become `FailedToStop`; they are recorded, not
    /// retried.
    pub async fn dispatch(&self, record: &ServiceRecord, now: DateTime<Utc>) -> CoreResult<DispatchOutcome> {
        let action = EnforcementAction::for_type(&record.resource_type);
        let (status, message) = self.execute(action, record).await;

        let update = RecordUpdate::action_taken(status, now, message.clone());
        match self
            .store
            .conditional_update(&record.service_id, ConfirmationStatus::Pending, &update)
        {
            Ok(()) => {
                info!(
                    service_id = %record.service_id,
                    resource_type = %record.resource_type,
                    action = ?action,
                    status = %status,
                    "Enforcement action committed"
                );

                let _ = self.store.append_audit(AuditEvent::new(
                    now,
                    AuditEventType::ActionTaken {
                        service_id: record.service_id.clone(),
                        status,
                        message,
                    },
                ));

                let mut updated = record.clone();
                update.apply_to(&mut updated);
                Ok(DispatchOutcome::Committed(CoreEvent::ActionTaken { record: updated }))
            }
            Err(StoreError::Conflict { current, .. }) => {
                // Re-read so the log reflects what actually won
                let current = self
                    .store
                    .get(&record.service_id)?
                    .map(|r| r.status)
                    .unwrap_or(current);
                warn!(
                    service_id = %record.service_id,
                    attempted = %status,
                    current = %current,
                    "Record settled by another writer; dropping enforcement result"
                );
                Ok(DispatchOutcome::Conflict { current })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn execute(&self, action: EnforcementAction, record: &ServiceRecord) -> (ConfirmationStatus, String) {
        let id = &record.service_id;
        let resource_type = &record.resource_type;
        let kind = resource_type.display_name();
        let region = record.region();

        let result = match action {
            EnforcementAction::Stop => self
                .controller
                .stop(resource_type, id)
                .await
                .map(|()| {
                    (
                        ConfirmationStatus::Stopped,
                        format!("{} '{}' in region '{}' has been stopped.", kind, id, region),
                    )
                }),
            EnforcementAction::Delete => self
                .controller
                .delete(resource_type, id)
                .await
                .map(|()| {
                    (
                        ConfirmationStatus::Terminated,
                        format!("{} '{}' in region '{}' has been deleted.", kind, id, region),
                    )
                }),
            EnforcementAction::DeleteIfEmpty => match self.controller.is_empty(resource_type, id).await {
                Ok(false) => Ok((
                    ConfirmationStatus::SkippedNotEmpty,
                    format!(
                        "{} '{}' in region '{}' is not empty and was NOT deleted. Manual review required.",
                        kind, id, region
                    ),
                )),
                Ok(true) => self.controller.delete(resource_type, id).await.map(|()| {
                    (
                        ConfirmationStatus::Terminated,
                        format!("{} '{}' in region '{}' has been deleted.", kind, id, region),
                    )
                }),
                Err(e) => Err(e),
            },
            EnforcementAction::Skip => Ok((
                ConfirmationStatus::SkippedUnsupportedType,
                format!(
                    "Service '{}' of type '{}' is not supported for automated stopping. Manual review required.",
                    id, kind
                ),
            )),
        };

        result.unwrap_or_else(|e| {
            warn!(service_id = %id, resource_type = %resource_type, error = %e, "Enforcement action failed");
            (
                ConfirmationStatus::FailedToStop,
                format!("Failed to stop/terminate {} '{}': {}", kind, id, e),
            )
        })
    }
}
