//! Core events emitted after lifecycle transitions

use warden_api::ServiceRecord;

/// Events emitted by the core once a transition has been committed.
///
/// Each event carries the record as written, so rendering never needs to
/// go back to the store.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// New Pending record opened by ingestion
    RecordCreated { record: ServiceRecord },

    /// Reminder bookkeeping committed for a still-Pending record
    ReminderDue { record: ServiceRecord },

    /// Enforcement moved the record to a terminal status
    ActionTaken { record: ServiceRecord },
}

impl CoreEvent {
    pub fn record(&self) -> &ServiceRecord {
        match self {
            CoreEvent::RecordCreated { record }
            | CoreEvent::ReminderDue { record }
            | CoreEvent::ActionTaken { record } => record,
        }
    }
}
