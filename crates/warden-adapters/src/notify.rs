//! Notifier adapters

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use warden_config::NotifierConfig;
use warden_controller_api::{Notifier, NotifyError, NotifyResult};

/// JSON payload posted by [`WebhookNotifier`]
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}

/// Delivers notifications as `POST {url}` with `{"subject", "body"}`
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| NotifyError::DeliveryFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, subject: &str, body: &str) -> NotifyResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { subject, body })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::DeliveryFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "webhook returned {}",
                status
            )));
        }

        debug!(subject = %subject, status = %status, "Webhook notification delivered");
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str) -> NotifyResult<()> {
        info!(subject = %subject, body = %body, "Notification");
        Ok(())
    }
}

/// Build the notifier selected in configuration
pub fn notifier_from_config(config: &NotifierConfig) -> NotifyResult<Arc<dyn Notifier>> {
    Ok(match config {
        NotifierConfig::Log => Arc::new(LogNotifier),
        NotifierConfig::Webhook { url, timeout } => Arc::new(WebhookNotifier::new(url, *timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use std::sync::Mutex;

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn capture(State(received): State<Received>, Json(payload): Json<serde_json::Value>) -> StatusCode {
        received.lock().unwrap().push(payload);
        StatusCode::NO_CONTENT
    }

    async fn reject() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/hook", addr)
    }

    #[tokio::test]
    async fn webhook_posts_subject_and_body() {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/hook", post(capture))
            .with_state(received.clone());
        let url = serve(app).await;

        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();
        notifier
            .send("REMINDER: Confirm Your EC2 Instance - i-123", "Please confirm")
            .await
            .unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0]["subject"],
            "REMINDER: Confirm Your EC2 Instance - i-123"
        );
        assert_eq!(received[0]["body"], "Please confirm");
    }

    #[tokio::test]
    async fn webhook_error_status_is_a_failure() {
        let url = serve(Router::new().route("/hook", post(reject))).await;

        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();
        let result = notifier.send("subject", "body").await;
        assert!(matches!(result, Err(NotifyError::DeliveryFailed(_))));
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = notifier_from_config(&NotifierConfig::Log).unwrap();
        notifier.send("subject", "body").await.unwrap();
    }
}
