//! Persistence layer for warden
//!
//! Provides:
//! - Service records keyed by service id (create-if-absent, point lookup,
//!   scan by status)
//! - Conditional updates guarded on the current status, the only way a
//!   record changes
//! - Audit log (append-only)

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;
use warden_api::ConfirmationStatus;
use warden_util::ServiceId;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(ServiceId),

    #[error("Record already exists: {0}")]
    AlreadyExists(ServiceId),

    #[error("Conflict on {service_id}: expected {expected}, found {current}")]
    Conflict {
        service_id: ServiceId,
        expected: ConfirmationStatus,
        current: ConfirmationStatus,
    },
}

impl StoreError {
    /// Conflicts are expected under concurrent transitions and resolved by
    /// the caller; everything else is an infrastructure failure
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
