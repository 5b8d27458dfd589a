//! Controller and notifier traits

use async_trait::async_trait;
use thiserror::Error;
use warden_api::ResourceType;
use warden_util::ServiceId;

/// Errors from resource controller operations
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Stop failed: {0}")]
    StopFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Emptiness check failed: {0}")]
    CheckFailed(String),

    #[error("No {operation} command configured for {resource_type}")]
    NotConfigured {
        resource_type: ResourceType,
        operation: &'static str,
    },

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Timed out")]
    Timeout,
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Raw stop/delete mechanics for provider resources.
///
/// Calls are not undoable. Implementations bound their own latency.
#[async_trait]
pub trait ResourceController: Send + Sync {
    /// Stop the resource, keeping its data
    async fn stop(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()>;

    /// Delete the resource
    async fn delete(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()>;

    /// Whether the resource holds no data (buckets)
    async fn is_empty(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<bool>;
}

/// Outbound message delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> NotifyResult<()>;
}
