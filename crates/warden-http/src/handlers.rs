//! Request handlers

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use warden_api::{ConfirmOutcome, CreationEvent, IngestOutcome};
use warden_core::CoreError;
use warden_util::ServiceId;

use crate::AppState;

/// Query parameters of the confirmation link
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmParams {
    pub service_id: Option<String>,
    pub confirmation_token: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Status code and plain-text body for a confirmation outcome
pub fn confirm_response(outcome: ConfirmOutcome) -> (StatusCode, String) {
    match outcome {
        ConfirmOutcome::Confirmed => (
            StatusCode::OK,
            "Service confirmed. It will not be stopped automatically.".into(),
        ),
        ConfirmOutcome::AlreadyConfirmed => (StatusCode::OK, "Service was already confirmed.".into()),
        ConfirmOutcome::NotFound => (StatusCode::NOT_FOUND, "Service not found.".into()),
        ConfirmOutcome::Forbidden => (StatusCode::FORBIDDEN, "Invalid confirmation token.".into()),
        ConfirmOutcome::Expired => (
            StatusCode::FORBIDDEN,
            "Confirmation link has expired.".into(),
        ),
        ConfirmOutcome::AlreadyEnforced { status } => (
            StatusCode::FORBIDDEN,
            format!("Service has already been processed ({}). The link is no longer valid.", status),
        ),
    }
}

/// `GET /confirm`
pub async fn confirm(State(state): State<AppState>, Query(params): Query<ConfirmParams>) -> (StatusCode, String) {
    let (Some(service_id), Some(token)) = (present(&params.service_id), present(&params.confirmation_token))
    else {
        return (
            StatusCode::BAD_REQUEST,
            "Missing serviceId or confirmationToken.".into(),
        );
    };

    let service_id = ServiceId::new(service_id);
    let now = state.clock.now();

    match state.core.confirmations.confirm(&service_id, token, now) {
        Ok(outcome) => {
            info!(service_id = %service_id, outcome = ?outcome, "Confirmation request handled");
            confirm_response(outcome)
        }
        Err(e) => {
            error!(service_id = %service_id, error = %e, "Confirmation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error, please retry later.".into(),
            )
        }
    }
}

/// JSON error body for the event endpoints
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Core failure surfaced as a 500
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Ingestion failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// `POST /events`
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<CreationEvent>,
) -> Result<Json<IngestOutcome>, ApiError> {
    let outcome = state.core.ingestor.ingest(&event, state.clock.now()).await?;
    Ok(Json(outcome))
}

/// `POST /events/cloudtrail`
pub async fn ingest_cloudtrail(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Json<IngestOutcome>, ApiError> {
    let Some(event) = state.classifier.classify(&raw) else {
        warn!("Unrecognized provider event, skipping");
        return Ok(Json(IngestOutcome::Skipped {
            reason: "unrecognized event".into(),
        }));
    };

    let outcome = state.core.ingestor.ingest(&event, state.clock.now()).await?;
    Ok(Json(outcome))
}

/// `GET /healthz`
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.core.store().is_healthy() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
    }
}
