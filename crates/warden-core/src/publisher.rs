//! Rendering and best-effort delivery of core events

use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use warden_api::ServiceRecord;
use warden_controller_api::Notifier;
use warden_util::ServiceId;

use crate::CoreEvent;

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Build the link a creator follows to confirm a resource
pub fn confirmation_link(public_base_url: &str, service_id: &ServiceId, token: &str) -> String {
    let base = format!("{}/confirm", public_base_url.trim_end_matches('/'));
    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("serviceId", service_id.as_str())
                .append_pair("confirmationToken", token);
            url.into()
        }
        // Unparsable base: plain formatting
        Err(_) => format!(
            "{}?serviceId={}&confirmationToken={}",
            base,
            service_id.as_str(),
            token
        ),
    }
}

/// Renders [`CoreEvent`]s and hands them to the configured [`Notifier`]
pub struct Publisher {
    notifier: Arc<dyn Notifier>,
    public_base_url: String,
}

impl Publisher {
    pub fn new(notifier: Arc<dyn Notifier>, public_base_url: impl Into<String>) -> Self {
        Self {
            notifier,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn render(&self, event: &CoreEvent) -> Message {
        match event {
            CoreEvent::RecordCreated { record } => self.render_created(record),
            CoreEvent::ReminderDue { record } => self.render_reminder(record),
            CoreEvent::ActionTaken { record } => render_action(record),
        }
    }

    /// Deliver one event. Failures are logged and never propagate: the
    /// transition behind the event is already committed.
    pub async fn publish(&self, event: &CoreEvent) -> bool {
        let message = self.render(event);
        let service_id = &event.record().service_id;

        match self.notifier.send(&message.subject, &message.body).await {
            Ok(()) => {
                debug!(service_id = %service_id, subject = %message.subject, "Notification sent");
                true
            }
            Err(e) => {
                warn!(service_id = %service_id, subject = %message.subject, error = %e, "Notification failed");
                false
            }
        }
    }

    fn link(&self, record: &ServiceRecord) -> String {
        confirmation_link(
            &self.public_base_url,
            &record.service_id,
            &record.confirmation_token,
        )
    }

    fn render_created(&self, record: &ServiceRecord) -> Message {
        let subject = format!(
            "ACTION REQUIRED: New {} Created - {}",
            record.resource_type.display_name(),
            record.service_id
        );
        let validity = record.confirmation_token_expiry - record.creation_timestamp;

        let body = format!(
            "A new {kind} ({id}) was created in account {account} in the {region} region.\n\
             Created by: {creator} ({identity})\n\
             Creation time (UTC): {created}\n\
             Resource: {locator}\n\
             \n\
             To keep this resource, confirm it within {minutes} minute(s) using the link below:\n\
             {link}\n\
             \n\
             The link expires at {expiry} UTC. Unconfirmed resources may be stopped or deleted automatically.\n",
            kind = record.resource_type.display_name(),
            id = record.service_id,
            account = record.account_id(),
            region = record.region(),
            creator = record.creator_name,
            identity = record.creator_identity,
            created = record.creation_timestamp.to_rfc3339(),
            locator = record.resource_locator,
            minutes = validity.num_minutes().max(0),
            link = self.link(record),
            expiry = record.confirmation_token_expiry.to_rfc3339(),
        );

        Message { subject, body }
    }

    fn render_reminder(&self, record: &ServiceRecord) -> Message {
        let subject = format!(
            "REMINDER: Confirm Your {} - {}",
            record.resource_type.display_name(),
            record.service_id
        );

        let body = format!(
            "Your {kind} ({id}) in region {region} still requires confirmation.\n\
             Created by: {creator}\n\
             Confirmation expires at: {expiry} UTC\n\
             \n\
             Confirm it using this link:\n\
             {link}\n\
             \n\
             If it is not confirmed, the resource may be stopped automatically.\n",
            kind = record.resource_type.display_name(),
            id = record.service_id,
            region = record.region(),
            creator = record.creator_name,
            expiry = record.confirmation_token_expiry.to_rfc3339(),
            link = self.link(record),
        );

        Message { subject, body }
    }
}

fn render_action(record: &ServiceRecord) -> Message {
    let subject = format!(
        "Service Action: {} - {} {}",
        record.status,
        record.resource_type.display_name(),
        record.service_id
    );

    let body = format!(
        "The {kind} ({id}) created by {creator} ({identity}) in region {region}\n\
         has been processed by automated enforcement.\n\
         \n\
         Status: {status}\n\
         Details: {details}\n\
         \n\
         If this was unexpected, review your confirmation process.\n",
        kind = record.resource_type.display_name(),
        id = record.service_id,
        creator = record.creator_name,
        identity = record.creator_identity,
        region = record.region(),
        status = record.status,
        details = record.last_action_message.as_deref().unwrap_or("N/A"),
    );

    Message { subject, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pending_record;
    use warden_api::{ConfirmationStatus, ResourceType};
    use warden_controller_api::RecordingNotifier;

    fn publisher(notifier: Arc<RecordingNotifier>) -> Publisher {
        Publisher::new(notifier, "https://warden.example.com/")
    }

    #[test]
    fn link_encodes_query() {
        let link = confirmation_link(
            "https://warden.example.com",
            &ServiceId::new("my bucket"),
            "abc-_123",
        );
        assert_eq!(
            link,
            "https://warden.example.com/confirm?serviceId=my+bucket&confirmationToken=abc-_123"
        );
    }

    #[test]
    fn created_message_carries_link_and_details() {
        let p = publisher(Arc::new(RecordingNotifier::new()));
        let record = pending_record("i-123", ResourceType::ComputeInstance);

        let message = p.render(&CoreEvent::RecordCreated {
            record: record.clone(),
        });

        assert_eq!(message.subject, "ACTION REQUIRED: New EC2 Instance Created - i-123");
        assert!(message.body.contains(&format!(
            "https://warden.example.com/confirm?serviceId=i-123&confirmationToken={}",
            record.confirmation_token
        )));
        assert!(message.body.contains("ap-south-1"));
        assert!(message.body.contains("60 minute(s)"));
    }

    #[test]
    fn reminder_and_action_subjects() {
        let p = publisher(Arc::new(RecordingNotifier::new()));
        let mut record = pending_record("my-bucket", ResourceType::StorageBucket);

        let reminder = p.render(&CoreEvent::ReminderDue {
            record: record.clone(),
        });
        assert_eq!(reminder.subject, "REMINDER: Confirm Your S3 Bucket - my-bucket");

        record.status = ConfirmationStatus::SkippedNotEmpty;
        record.last_action_message = Some("bucket is not empty".into());
        let action = p.render(&CoreEvent::ActionTaken { record });
        assert_eq!(
            action.subject,
            "Service Action: Skipped_Not_Empty - S3 Bucket my-bucket"
        );
        assert!(action.body.contains("bucket is not empty"));
    }

    #[tokio::test]
    async fn publish_swallows_delivery_failure() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.set_fail_send(true);
        let p = publisher(notifier.clone());

        let delivered = p
            .publish(&CoreEvent::ReminderDue {
                record: pending_record("i-123", ResourceType::ComputeInstance),
            })
            .await;

        assert!(!delivered);
        assert_eq!(notifier.count(), 1);
    }
}
