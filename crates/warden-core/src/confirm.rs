//! Confirmation processing

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_api::{ConfirmOutcome, ConfirmationStatus, RecordUpdate, ServiceRecord};
use warden_store::{AuditEvent, AuditEventType, LifecycleStore, StoreError};
use warden_util::ServiceId;

use crate::{CoreResult, tokens_match};

/// Validates submitted tokens and commits Pending -> Confirmed
pub struct ConfirmationProcessor {
    store: Arc<dyn LifecycleStore>,
}

impl ConfirmationProcessor {
    pub fn new(store: Arc<dyn LifecycleStore>) -> Self {
        Self { store }
    }

    /// Handle one confirmation request.
    ///
    /// Never mutates anything unless the token matches, has not expired and
    /// the record is still Pending. Repeated and concurrent calls converge
    /// on the same outcome.
    pub fn confirm(
        &self,
        service_id: &ServiceId,
        submitted_token: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<ConfirmOutcome> {
        let Some(record) = self.store.get(service_id)? else {
            debug!(service_id = %service_id, "Confirmation for unknown service");
            return Ok(ConfirmOutcome::NotFound);
        };

        if let Some(outcome) = precheck(&record, submitted_token, now) {
            debug!(service_id = %service_id, outcome = ?outcome, "Confirmation refused");
            return Ok(outcome);
        }

        match self.store.conditional_update(
            service_id,
            ConfirmationStatus::Pending,
            &RecordUpdate::confirmed(now),
        ) {
            Ok(()) => {
                info!(service_id = %service_id, "Service confirmed");
                let _ = self.store.append_audit(AuditEvent::new(
                    now,
                    AuditEventType::Confirmed {
                        service_id: service_id.clone(),
                    },
                ));
                Ok(ConfirmOutcome::Confirmed)
            }
            Err(StoreError::Conflict { current, .. }) => {
                warn!(
                    service_id = %service_id,
                    current = %current,
                    "Confirmation lost the race to another transition"
                );
                Ok(outcome_for_settled(current))
            }
            Err(StoreError::NotFound(_)) => Ok(ConfirmOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome decided without writing, if any
fn precheck(record: &ServiceRecord, submitted_token: &str, now: DateTime<Utc>) -> Option<ConfirmOutcome> {
    if record.status == ConfirmationStatus::Confirmed {
        return Some(ConfirmOutcome::AlreadyConfirmed);
    }
    if !tokens_match(&record.confirmation_token, submitted_token) {
        return Some(ConfirmOutcome::Forbidden);
    }
    if record.is_expired(now) {
        return Some(ConfirmOutcome::Expired);
    }
    if record.status != ConfirmationStatus::Pending {
        return Some(ConfirmOutcome::AlreadyEnforced {
            status: record.status,
        });
    }
    None
}

/// Outcome for a record some other writer already moved out of Pending
fn outcome_for_settled(current: ConfirmationStatus) -> ConfirmOutcome {
    match current {
        ConfirmationStatus::Confirmed => ConfirmOutcome::AlreadyConfirmed,
        status => ConfirmOutcome::AlreadyEnforced { status },
    }
}
