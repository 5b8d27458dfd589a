//! Audit event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_api::{ConfirmationStatus, ResourceType};
use warden_util::ServiceId;

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Daemon started
    ServiceStarted,

    /// Daemon stopped
    ServiceStopped,

    /// New Pending record opened by ingestion
    RecordCreated {
        service_id: ServiceId,
        resource_type: ResourceType,
        expires_at: DateTime<Utc>,
    },

    /// Ingestion saw an id it already knows
    DuplicateIgnored { service_id: ServiceId },

    /// Pending -> Confirmed
    Confirmed { service_id: ServiceId },

    /// Reminder issued for a Pending record
    ReminderSent { service_id: ServiceId },

    /// Enforcement moved a record to a terminal status
    ActionTaken {
        service_id: ServiceId,
        status: ConfirmationStatus,
        message: String,
    },

    /// Scheduler pass finished inside the window
    TickCompleted {
        records_processed: usize,
        actions_taken: usize,
        reminders_sent: usize,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(timestamp: DateTime<Utc>, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
