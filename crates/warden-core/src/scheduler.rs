//! Enforcement scheduler

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warden_api::{ConfirmationStatus, RecordUpdate, ServiceRecord, TickSummary};
use warden_store::{AuditEvent, AuditEventType, LifecycleStore, StoreError};
use warden_util::EnforcementWindow;

use crate::{ActionDispatcher, CoreEvent, CoreResult, DispatchOutcome, Publisher};

/// What a tick decided for one Pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDecision {
    Enforce,
    Remind,
    Wait,
}

/// Decide what to do with a Pending record at `now`
pub fn decide(
    record: &ServiceRecord,
    now: DateTime<Utc>,
    window: &EnforcementWindow,
    reminder_interval: chrono::Duration,
) -> RecordDecision {
    if record.is_expired(now) {
        return RecordDecision::Enforce;
    }

    let reminder_due = record
        .last_notification_sent
        .is_none_or(|sent| now - sent >= reminder_interval);

    if reminder_due && window.allows_reminder(now) {
        RecordDecision::Remind
    } else {
        RecordDecision::Wait
    }
}

/// Periodic pass over Pending records: enforce the expired ones, remind
/// the rest when due. Holds no state between ticks.
pub struct EnforcementScheduler {
    store: Arc<dyn LifecycleStore>,
    dispatcher: ActionDispatcher,
    publisher: Arc<Publisher>,
    window: EnforcementWindow,
    reminder_interval: chrono::Duration,
}

impl EnforcementScheduler {
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        dispatcher: ActionDispatcher,
        publisher: Arc<Publisher>,
        window: EnforcementWindow,
        reminder_interval: chrono::Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            publisher,
            window,
            reminder_interval,
        }
    }

    pub fn window(&self) -> &EnforcementWindow {
        &self.window
    }

    /// Run one pass.
    ///
    /// Outside the window this touches nothing. Inside, per-record failures
    /// are counted and the batch continues; only a failed Pending scan is
    /// returned as an error.
    pub async fn tick(&self, now: DateTime<Utc>) -> CoreResult<TickSummary> {
        let in_window = self.window.contains(now);
        let mut summary = TickSummary::new(now, in_window);

        if !in_window {
            debug!(
                tick_id = %summary.tick_id,
                local_time = %self.window.local_time(now).format("%H:%M"),
                "Outside enforcement window, skipping"
            );
            return Ok(summary);
        }

        let pending = self.store.scan_by_status(ConfirmationStatus::Pending).map_err(|e| {
            error!(tick_id = %summary.tick_id, error = %e, "Failed to scan pending records");
            e
        })?;

        info!(tick_id = %summary.tick_id, pending = pending.len(), "Enforcement tick started");

        for record in &pending {
            summary.records_processed += 1;

            match decide(record, now, &self.window, self.reminder_interval) {
                RecordDecision::Enforce => match self.dispatcher.dispatch(record, now).await {
                    Ok(DispatchOutcome::Committed(event)) => {
                        summary.actions_taken += 1;
                        self.publisher.publish(&event).await;
                    }
                    Ok(DispatchOutcome::Conflict { .. }) => summary.conflicts += 1,
                    Err(e) => {
                        summary.failures += 1;
                        error!(
                            tick_id = %summary.tick_id,
                            service_id = %record.service_id,
                            error = %e,
                            "Enforcement failed; record stays Pending"
                        );
                    }
                },
                RecordDecision::Remind => match self.remind(record, now).await {
                    Ok(true) => summary.reminders_sent += 1,
                    Ok(false) => summary.conflicts += 1,
                    Err(e) => {
                        summary.failures += 1;
                        error!(
                            tick_id = %summary.tick_id,
                            service_id = %record.service_id,
                            error = %e,
                            "Reminder bookkeeping failed"
                        );
                    }
                },
                RecordDecision::Wait => {
                    debug!(service_id = %record.service_id, "Pending, no reminder due yet");
                }
            }
        }

        let _ = self.store.append_audit(AuditEvent::new(
            now,
            AuditEventType::TickCompleted {
                records_processed: summary.records_processed,
                actions_taken: summary.actions_taken,
                reminders_sent: summary.reminders_sent,
            },
        ));

        info!(
            tick_id = %summary.tick_id,
            processed = summary.records_processed,
            actions = summary.actions_taken,
            reminders = summary.reminders_sent,
            conflicts = summary.conflicts,
            failures = summary.failures,
            "Enforcement tick completed"
        );

        Ok(summary)
    }

    /// Stamp `last_notification_sent` while the record is still Pending,
    /// then publish. Returns false if the record was settled meanwhile.
    async fn remind(&self, record: &ServiceRecord, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let update = RecordUpdate::reminder_sent(now);
        match self
            .store
            .conditional_update(&record.service_id, ConfirmationStatus::Pending, &update)
        {
            Ok(()) => {}
            Err(StoreError::Conflict { current, .. }) => {
                debug!(service_id = %record.service_id, current = %current, "Record settled before reminder");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        let _ = self.store.append_audit(AuditEvent::new(
            now,
            AuditEventType::ReminderSent {
                service_id: record.service_id.clone(),
            },
        ));

        let mut updated = record.clone();
        update.apply_to(&mut updated);
        if !self.publisher.publish(&CoreEvent::ReminderDue { record: updated }).await {
            warn!(service_id = %record.service_id, "Reminder recorded but not delivered");
        }
        Ok(true)
    }
}
