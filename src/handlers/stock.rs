use crate::{
    errors::ServiceError,
    services::stock::{PurchaseLine, VerificationOutcome},
    AppState,
};
use axum::{extract::State, Json};
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyStockRequest {
    pub items: Vec<PurchaseLine>,
}

/// POST /api/v1/stock/verify
///
/// Shortfalls come back as `success = false` with a customer-facing
/// message, not as an error status, so the storefront can redirect back to
/// cart review.
#[utoipa::path(
    post,
    path = "/api/v1/stock/verify",
    request_body = VerifyStockRequest,
    responses((status = 200, description = "Verification outcome", body = VerificationOutcome)),
    tag = "Stock"
)]
pub async fn verify_stock(
    State(state): State<AppState>,
    Json(request): Json<VerifyStockRequest>,
) -> Result<Json<VerificationOutcome>, ServiceError> {
    let outcome = state.services.stock.verify(&request.items).await?;
    Ok(Json(outcome))
}
