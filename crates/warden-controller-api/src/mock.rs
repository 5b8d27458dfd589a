//! Mock collaborators for testing

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use warden_api::ResourceType;
use warden_util::ServiceId;

use crate::{
    ControllerError, ControllerResult, Notifier, NotifyError, NotifyResult, ResourceController,
};

/// A call received by [`MockController`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCall {
    Stop(ResourceType, ServiceId),
    Delete(ResourceType, ServiceId),
    IsEmpty(ResourceType, ServiceId),
}

/// Mock resource controller for unit/integration testing
pub struct MockController {
    calls: Arc<Mutex<Vec<ControllerCall>>>,

    /// Resources that report data when checked for emptiness
    non_empty: Arc<Mutex<HashSet<ServiceId>>>,

    /// Configure stop to fail
    pub fail_stop: Arc<Mutex<bool>>,

    /// Configure delete to fail
    pub fail_delete: Arc<Mutex<bool>>,
}

impl MockController {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            non_empty: Arc::new(Mutex::new(HashSet::new())),
            fail_stop: Arc::new(Mutex::new(false)),
            fail_delete: Arc::new(Mutex::new(false)),
        }
    }

    /// Make `is_empty` report data for this resource
    pub fn set_non_empty(&self, id: impl Into<ServiceId>) {
        self.non_empty.lock().unwrap().insert(id.into());
    }

    pub fn set_fail_stop(&self, fail: bool) {
        *self.fail_stop.lock().unwrap() = fail;
    }

    pub fn set_fail_delete(&self, fail: bool) {
        *self.fail_delete.lock().unwrap() = fail;
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<ControllerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of stop/delete calls, the ones with side effects
    pub fn mutation_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !matches!(c, ControllerCall::IsEmpty(..)))
            .count()
    }

    fn record(&self, call: ControllerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceController for MockController {
    async fn stop(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        self.record(ControllerCall::Stop(resource_type.clone(), id.clone()));

        if *self.fail_stop.lock().unwrap() {
            return Err(ControllerError::StopFailed("Mock stop failure".into()));
        }
        Ok(())
    }

    async fn delete(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        self.record(ControllerCall::Delete(resource_type.clone(), id.clone()));

        if *self.fail_delete.lock().unwrap() {
            return Err(ControllerError::DeleteFailed("Mock delete failure".into()));
        }
        Ok(())
    }

    async fn is_empty(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<bool> {
        self.record(ControllerCall::IsEmpty(resource_type.clone(), id.clone()));
        Ok(!self.non_empty.lock().unwrap().contains(id))
    }
}

/// A message captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub subject: String,
    pub body: String,
}

/// Notifier that keeps every message it is asked to send
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentMessage>>>,

    /// Configure send to fail (the message is still recorded as attempted)
    pub fail_send: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_send: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_fail_send(&self, fail: bool) {
        *self.fail_send.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Messages whose subject starts with `prefix`
    pub fn with_prefix(&self, prefix: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.subject.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> NotifyResult<()> {
        self.sent.lock().unwrap().push(SentMessage {
            subject: subject.to_string(),
            body: body.to_string(),
        });

        if *self.fail_send.lock().unwrap() {
            return Err(NotifyError::DeliveryFailed("Mock send failure".into()));
        }
        Ok(())
    }
}
