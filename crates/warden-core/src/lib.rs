//! Lifecycle state machine and enforcement scheduler for warden
//!
//! This crate is the heart of wardend, containing:
//! - Confirmation token issuance and constant-time validation
//! - Ingestion of creation events (Pending record + initial notification)
//! - Confirmation processing (Pending -> Confirmed)
//! - Window-gated enforcement ticks with reminder deduplication
//! - Per-resource-type action dispatch with race-safe terminal transitions
//! - Rendering and best-effort delivery of notifications

mod classify;
mod confirm;
mod dispatch;
mod error;
mod events;
mod ingest;
mod publisher;
mod scheduler;
mod token;

pub use classify::*;
pub use confirm::*;
pub use dispatch::*;
pub use error::*;
pub use events::*;
pub use ingest::*;
pub use publisher::*;
pub use scheduler::*;
pub use token::*;

use std::sync::Arc;
use tracing::info;
use warden_config::Policy;
use warden_controller_api::{Notifier, ResourceController};
use warden_store::LifecycleStore;

/// The three entrypoints wired to one set of collaborators
pub struct WardenCore {
    pub ingestor: Ingestor,
    pub confirmations: ConfirmationProcessor,
    pub scheduler: EnforcementScheduler,
    store: Arc<dyn LifecycleStore>,
}

impl WardenCore {
    pub fn new(
        policy: &Policy,
        store: Arc<dyn LifecycleStore>,
        controller: Arc<dyn ResourceController>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let publisher = Arc::new(Publisher::new(
            notifier,
            policy.service.public_base_url.clone(),
        ));

        let ingestor = Ingestor::new(
            store.clone(),
            TokenIssuer::new(),
            publisher.clone(),
            policy.confirmation_validity,
        );
        let confirmations = ConfirmationProcessor::new(store.clone());
        let scheduler = EnforcementScheduler::new(
            store.clone(),
            ActionDispatcher::new(store.clone(), controller),
            publisher,
            policy.window,
            policy.reminder_interval,
        );

        info!(
            validity_minutes = policy.confirmation_validity.num_minutes(),
            start_hour = policy.window.start_hour(),
            end_hour = policy.window.end_hour(),
            phase_minute = policy.window.phase_minute(),
            utc_offset_minutes = policy.window.utc_offset_minutes(),
            "Core initialized"
        );

        Self {
            ingestor,
            confirmations,
            scheduler,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn LifecycleStore> {
        &self.store
    }
}
