//! Shared types for the warden lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use warden_util::ServiceId;

/// Kind of governed resource.
///
/// Anything the classifier could not map onto a known kind is kept as
/// `Unsupported` with its original label, so enforcement can refuse it by
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    ComputeInstance,
    StorageBucket,
    FunctionResource,
    ManagedDatabase,
    Unsupported(String),
}

impl ResourceType {
    /// Stable tag used in storage and configuration
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::ComputeInstance => "compute_instance",
            ResourceType::StorageBucket => "storage_bucket",
            ResourceType::FunctionResource => "function",
            ResourceType::ManagedDatabase => "managed_database",
            ResourceType::Unsupported(label) => label,
        }
    }

    /// Human-readable name used in notifications
    pub fn display_name(&self) -> &str {
        match self {
            ResourceType::ComputeInstance => "EC2 Instance",
            ResourceType::StorageBucket => "S3 Bucket",
            ResourceType::FunctionResource => "Lambda Function",
            ResourceType::ManagedDatabase => "RDS DB Instance",
            ResourceType::Unsupported(label) => label,
        }
    }

    /// Parse a tag or a display name. Never fails: unknown labels become
    /// `Unsupported`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "compute_instance" | "ec2 instance" | "ec2" => ResourceType::ComputeInstance,
            "storage_bucket" | "s3 bucket" | "s3" => ResourceType::StorageBucket,
            "function" | "lambda function" | "lambda" => ResourceType::FunctionResource,
            "managed_database" | "rds db instance" | "rds" => ResourceType::ManagedDatabase,
            _ => ResourceType::Unsupported(s.trim().to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ResourceType::Unsupported(_))
    }
}

impl From<String> for ResourceType {
    fn from(s: String) -> Self {
        ResourceType::parse(&s)
    }
}

impl From<ResourceType> for String {
    fn from(t: ResourceType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Lifecycle status of a service record. `Pending` is the only
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Stopped,
    Terminated,
    #[serde(rename = "Skipped_Not_Empty")]
    SkippedNotEmpty,
    #[serde(rename = "Skipped_Unsupported_Type")]
    SkippedUnsupportedType,
    #[serde(rename = "Failed_To_Stop")]
    FailedToStop,
}

impl ConfirmationStatus {
    pub const ALL: [ConfirmationStatus; 7] = [
        ConfirmationStatus::Pending,
        ConfirmationStatus::Confirmed,
        ConfirmationStatus::Stopped,
        ConfirmationStatus::Terminated,
        ConfirmationStatus::SkippedNotEmpty,
        ConfirmationStatus::SkippedUnsupportedType,
        ConfirmationStatus::FailedToStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Pending => "Pending",
            ConfirmationStatus::Confirmed => "Confirmed",
            ConfirmationStatus::Stopped => "Stopped",
            ConfirmationStatus::Terminated => "Terminated",
            ConfirmationStatus::SkippedNotEmpty => "Skipped_Not_Empty",
            ConfirmationStatus::SkippedUnsupportedType => "Skipped_Unsupported_Type",
            ConfirmationStatus::FailedToStop => "Failed_To_Stop",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationStatus::Pending)
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown confirmation status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ConfirmationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfirmationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Where the resource lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountContext {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Persisted lifecycle entity for one governed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_id: ServiceId,
    pub resource_type: ResourceType,
    /// ARN-equivalent descriptive string
    pub resource_locator: String,
    pub creator_identity: String,
    pub creator_name: String,
    pub creation_timestamp: DateTime<Utc>,
    pub account: AccountContext,
    pub status: ConfirmationStatus,
    pub confirmation_token: String,
    pub confirmation_token_expiry: DateTime<Utc>,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub last_action_time: Option<DateTime<Utc>>,
    pub last_action_message: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    /// Strictly past the expiry; a request at exactly the expiry instant
    /// still counts
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.confirmation_token_expiry
    }

    pub fn is_pending(&self) -> bool {
        self.status == ConfirmationStatus::Pending
    }

    pub fn region(&self) -> &str {
        self.account.region.as_deref().unwrap_or("N/A")
    }

    pub fn account_id(&self) -> &str {
        self.account.account_id.as_deref().unwrap_or("N/A")
    }
}

/// Fields written by a conditional update. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub status: Option<ConfirmationStatus>,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub last_action_time: Option<DateTime<Utc>>,
    pub last_action_message: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl RecordUpdate {
    /// Pending -> Confirmed
    pub fn confirmed(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ConfirmationStatus::Confirmed),
            confirmed_at: Some(at),
            ..Default::default()
        }
    }

    /// Reminder bookkeeping; status stays Pending
    pub fn reminder_sent(at: DateTime<Utc>) -> Self {
        Self {
            last_notification_sent: Some(at),
            ..Default::default()
        }
    }

    /// Pending -> one of the enforcement statuses
    pub fn action_taken(status: ConfirmationStatus, at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            last_action_time: Some(at),
            last_action_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, record: &mut ServiceRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(at) = self.last_notification_sent {
            record.last_notification_sent = Some(at);
        }
        if let Some(at) = self.last_action_time {
            record.last_action_time = Some(at);
        }
        if let Some(message) = &self.last_action_message {
            record.last_action_message = Some(message.clone());
        }
        if let Some(at) = self.confirmed_at {
            record.confirmed_at = Some(at);
        }
    }
}

/// Normalized creation event handed to ingestion by an event classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationEvent {
    pub resource_type: ResourceType,
    /// Missing when the classifier could not find a stable id; such events
    /// are skipped
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub creator_identity: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource_locator: Option<String>,
    #[serde(default)]
    pub account_context: AccountContext,
}

impl CreationEvent {
    /// The resource id, if present and not blank
    pub fn service_id(&self) -> Option<ServiceId> {
        self.resource_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ServiceId::new)
    }
}
