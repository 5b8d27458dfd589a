//! Store trait definitions

use warden_api::{ConfirmationStatus, RecordUpdate, ServiceRecord};
use warden_util::ServiceId;

use crate::{AuditEvent, StoreResult};

/// Lifecycle store.
///
/// Implementations must make `conditional_update` atomic: the status check
/// and the write happen as one step, so that of two writers racing on the
/// same Pending record exactly one succeeds and the other gets
/// `StoreError::Conflict`.
pub trait LifecycleStore: Send + Sync {
    // Service records

    /// Insert a record unless one with the same id exists
    /// (`StoreError::AlreadyExists`); an existing record is never touched
    fn create_if_absent(&self, record: &ServiceRecord) -> StoreResult<()>;

    /// Point lookup
    fn get(&self, service_id: &ServiceId) -> StoreResult<Option<ServiceRecord>>;

    /// Apply `update` only if the record's status is still `expected`
    fn conditional_update(
        &self,
        service_id: &ServiceId,
        expected: ConfirmationStatus,
        update: &RecordUpdate,
    ) -> StoreResult<()>;

    /// All records with the given status, oldest first
    fn scan_by_status(&self, status: ConfirmationStatus) -> StoreResult<Vec<ServiceRecord>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
