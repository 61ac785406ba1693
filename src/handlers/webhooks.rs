use crate::{
    errors::ServiceError,
    payment::webhook::{verify_signature, WebhookEvent},
    AppState,
};
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use bytes::Bytes;
use serde_json::json;
use tracing::warn;

/// POST /api/v1/payments/webhook
///
/// Signature verification runs over the raw request body, so this route
/// must receive it unparsed. Every handled path (including ignored event
/// types and replays) acknowledges with `{"received": true}`; processing
/// failures surface as 5xx so the provider retries delivery.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Notification acknowledged"),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    // Finalization is never unsigned: a missing secret rejects outright.
    let Some(secret) = state.config.payment_webhook_secret.as_deref() else {
        warn!("Payment webhook received but no webhook secret is configured");
        return Err(ServiceError::Unauthorized(
            "webhook signature verification unavailable".to_string(),
        ));
    };

    if !verify_signature(
        &headers,
        &body,
        secret,
        state.config.payment_webhook_tolerance_secs,
    ) {
        warn!("Payment webhook signature verification failed");
        return Err(ServiceError::Unauthorized(
            "invalid webhook signature".to_string(),
        ));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid webhook payload: {}", e)))?;

    state.services.finalizer.handle_event(event).await?;

    Ok(Json(json!({ "received": true })))
}
