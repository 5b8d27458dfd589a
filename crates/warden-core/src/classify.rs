//! Classification of raw provider events into creation events

use chrono::{DateTime, Utc};
use serde_json::Value;
use warden_api::{AccountContext, CreationEvent, ResourceType};

/// Turns a raw provider event into a normalized [`CreationEvent`].
///
/// `None` means the event does not describe a resource creation this
/// classifier understands.
pub trait EventClassifier: Send + Sync {
    fn classify(&self, raw: &Value) -> Option<CreationEvent>;
}

/// Classifier for CloudTrail management events, either bare or wrapped in
/// an EventBridge envelope (`{"detail": {...}}`)
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudTrailClassifier;

impl CloudTrailClassifier {
    pub fn new() -> Self {
        Self
    }
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
}

impl EventClassifier for CloudTrailClassifier {
    fn classify(&self, raw: &Value) -> Option<CreationEvent> {
        let detail = raw.get("detail").unwrap_or(raw);

        let source = str_at(detail, &["eventSource"])?;
        let name = str_at(detail, &["eventName"])?;
        let region = str_at(detail, &["awsRegion"]);
        let account = str_at(detail, &["recipientAccountId"]);

        let (resource_type, resource_id) = match (source, name) {
            ("ec2.amazonaws.com", "RunInstances") => (
                ResourceType::ComputeInstance,
                detail
                    .pointer("/responseElements/instancesSet/items/0/instanceId")
                    .and_then(Value::as_str),
            ),
            ("s3.amazonaws.com", "CreateBucket") => (
                ResourceType::StorageBucket,
                str_at(detail, &["requestParameters", "bucketName"]),
            ),
            ("lambda.amazonaws.com", "CreateFunction") => (
                ResourceType::FunctionResource,
                str_at(detail, &["requestParameters", "functionName"]),
            ),
            ("rds.amazonaws.com", "CreateDBInstance") => (
                ResourceType::ManagedDatabase,
                str_at(detail, &["requestParameters", "dBInstanceIdentifier"]),
            ),
            _ => return None,
        };

        let region_or_na = region.unwrap_or("N/A");
        let account_or_na = account.unwrap_or("N/A");
        let resource_locator = resource_id.map(|id| match resource_type {
            ResourceType::ComputeInstance => {
                format!("arn:aws:ec2:{}:{}:instance/{}", region_or_na, account_or_na, id)
            }
            ResourceType::StorageBucket => format!("arn:aws:s3:::{}", id),
            ResourceType::FunctionResource => {
                format!("arn:aws:lambda:{}:{}:function:{}", region_or_na, account_or_na, id)
            }
            ResourceType::ManagedDatabase => {
                format!("arn:aws:rds:{}:{}:db:{}", region_or_na, account_or_na, id)
            }
            ResourceType::Unsupported(_) => id.to_string(),
        });

        let creator_name = str_at(detail, &["userIdentity", "userName"]).or_else(|| {
            str_at(
                detail,
                &["userIdentity", "sessionContext", "sessionIssuer", "userName"],
            )
        });

        let creation_time = str_at(detail, &["eventTime"])
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        Some(CreationEvent {
            resource_type,
            resource_id: resource_id.map(String::from),
            creator_identity: str_at(detail, &["userIdentity", "arn"]).map(String::from),
            creator_name: creator_name.map(String::from),
            creation_time,
            resource_locator,
            account_context: AccountContext {
                account_id: account.map(String::from),
                region: region.map(String::from),
            },
        })
    }
}
