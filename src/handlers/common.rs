use crate::{errors::ServiceError, services::ratings::UserIdentity};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))
}

/// Extracts the storefront identity the fronting auth layer injects.
///
/// Session issuance is external; this service trusts the
/// `x-user-email` / `x-user-name` / `x-user-image` headers set by that
/// layer and rejects requests carrying none.
#[async_trait]
impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let email = header("x-user-email")
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("غير مصرح".to_string()))?;
        let name = header("x-user-name").unwrap_or_else(|| email.clone());
        let image = header("x-user-image");

        Ok(UserIdentity { name, email, image })
    }
}
