use crate::{
    cart::GroupedLine,
    errors::ServiceError,
    payment::CustomerDetails,
    services::checkout::{CheckoutInput, CheckoutResponse},
    AppState,
};
use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

/// Checkout request: validated shipping/contact fields plus the
/// JSON-encoded grouped cart array the client ledger produced.
///
/// Required fields default to empty on absence so that missing and empty
/// input both surface as the same validation failure.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub last_name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub address: String,
    pub address2: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub city: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub country: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub postal_code: String,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub cart_items: String,
}

/// POST /api/v1/checkout
///
/// Validation failures surface before any call to the payment provider.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Redirect URL to the hosted payment page", body = CheckoutResponse),
        (status = 400, description = "Missing fields or invalid cart", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ServiceError> {
    if request.validate().is_err() {
        return Err(ServiceError::ValidationError(
            "حقول مطلوبة مفقودة".to_string(),
        ));
    }

    let lines: Vec<GroupedLine> = serde_json::from_str(&request.cart_items)
        .map_err(|_| ServiceError::BadRequest("صيغة السلة غير صالحة".to_string()))?;

    let input = CheckoutInput {
        customer: CustomerDetails {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            address: request.address,
            address2: request.address2,
            state: request.state,
            city: request.city,
            country: request.country,
            postal_code: request.postal_code,
        },
        notes: request.notes.filter(|n| !n.trim().is_empty()),
        lines,
    };

    let response = state.services.checkout.create_session(input).await?;
    Ok(Json(response))
}
