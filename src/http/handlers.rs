//! Route handlers and error rendering.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::Mailer;
use crate::mailer::{MailerError, ProviderError, ThrottleStatus};
use crate::ratelimit::Operation;

/// Body of both email-triggering routes.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Serialize)]
struct Accepted {
    success: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Mailer(MailerError),
}

impl From<MailerError> for ApiError {
    fn from(e: MailerError) -> Self {
        ApiError::Mailer(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Mailer(err @ MailerError::RateLimited { retry_after_secs, .. }) => {
                retry_after = Some(retry_after_secs);
                (StatusCode::TOO_MANY_REQUESTS, err.to_string())
            }
            ApiError::Mailer(MailerError::Provider(ProviderError::Rejected { message, .. })) => {
                (StatusCode::BAD_GATEWAY, message)
            }
            ApiError::Mailer(MailerError::Provider(err @ ProviderError::Transport(_))) => {
                // Log the real error server-side, return generic message to client
                error!(error = %err, "Email provider unreachable");
                (
                    StatusCode::BAD_GATEWAY,
                    "Email provider unavailable".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Build the service router.
pub fn router(mailer: Arc<Mailer>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/password-reset", post(password_reset))
        .route("/auth/resend-confirmation", post(resend_confirmation))
        .route("/auth/limits/{operation}/{email}", get(limits))
        .with_state(mailer)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn require_email(payload: &EmailRequest) -> Result<(), ApiError> {
    if payload.email.trim().is_empty() {
        warn!("Received email request with empty address");
        return Err(ApiError::BadRequest("email is required".to_string()));
    }
    Ok(())
}

#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn password_reset(
    State(mailer): State<Arc<Mailer>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    require_email(&payload)?;
    debug!("Processing password reset request");

    mailer.request_password_reset(&payload.email).await?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { success: true })))
}

#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn resend_confirmation(
    State(mailer): State<Arc<Mailer>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    require_email(&payload)?;
    debug!("Processing confirmation resend request");

    mailer.resend_confirmation(&payload.email).await?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { success: true })))
}

async fn limits(
    State(mailer): State<Arc<Mailer>>,
    Path((operation, email)): Path<(String, String)>,
) -> Result<Json<ThrottleStatus>, ApiError> {
    let operation: Operation = operation.parse().map_err(ApiError::NotFound)?;
    Ok(Json(mailer.status(operation, &email)))
}
