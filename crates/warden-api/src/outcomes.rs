//! Outcomes returned across the core's entrypoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_util::{ServiceId, TickId};

use crate::ConfirmationStatus;

/// Result of a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// No record for this service id
    NotFound,
    /// Token does not match
    Forbidden,
    /// Token matches but was submitted after its expiry
    Expired,
    /// Record was already confirmed; nothing changed
    AlreadyConfirmed,
    /// Pending -> Confirmed happened on this request
    Confirmed,
    /// Enforcement already moved the record to a terminal status
    AlreadyEnforced { status: ConfirmationStatus },
}

impl ConfirmOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed | ConfirmOutcome::AlreadyConfirmed)
    }
}

/// Result of ingesting one creation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// New Pending record opened
    Created {
        service_id: ServiceId,
        expires_at: DateTime<Utc>,
    },
    /// A record for this id already exists and was left untouched
    Duplicate { service_id: ServiceId },
    /// Event carried no usable resource id
    Skipped { reason: String },
}

/// Summary of one scheduler tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick_id: TickId,
    pub at: DateTime<Utc>,
    /// False when the tick fell outside the enforcement window and did
    /// nothing
    pub in_window: bool,
    pub records_processed: usize,
    pub actions_taken: usize,
    pub reminders_sent: usize,
    /// Records another writer transitioned first
    pub conflicts: usize,
    /// Records whose processing failed and will be retried next tick
    pub failures: usize,
}

impl TickSummary {
    pub fn new(at: DateTime<Utc>, in_window: bool) -> Self {
        Self {
            tick_id: TickId::new(),
            at,
            in_window,
            records_processed: 0,
            actions_taken: 0,
            reminders_sent: 0,
            conflicts: 0,
            failures: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_outcomes() {
        assert!(ConfirmOutcome::Confirmed.is_success());
        assert!(ConfirmOutcome::AlreadyConfirmed.is_success());
        assert!(!ConfirmOutcome::Expired.is_success());
        assert!(!ConfirmOutcome::Forbidden.is_success());
        assert!(!ConfirmOutcome::AlreadyEnforced {
            status: ConfirmationStatus::Stopped
        }
        .is_success());
    }

    #[test]
    fn outcome_serialization() {
        let json = serde_json::to_string(&ConfirmOutcome::AlreadyEnforced {
            status: ConfirmationStatus::Terminated,
        })
        .unwrap();
        assert_eq!(json, r#"{"outcome":"already_enforced","status":"Terminated"}"#);
    }
}
