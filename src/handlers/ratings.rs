use crate::{
    entities::ProductRatingModel,
    errors::ServiceError,
    handlers::common::validate_input,
    services::ratings::{RatingInput, UserIdentity},
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// Rating mutation responses return the product's full updated list so the
/// storefront can re-render in place.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RatingsResponse {
    pub message: String,
    pub updated_ratings: Vec<ProductRatingModel>,
}

/// GET /api/v1/products/:id/ratings
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/ratings",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Ratings for the product", body = [ProductRatingModel]),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Ratings"
)]
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProductRatingModel>>, ServiceError> {
    Ok(Json(state.services.ratings.list(id).await?))
}

/// POST /api/v1/products/:id/ratings
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/ratings",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = RatingInput,
    responses(
        (status = 200, description = "Rating added", body = RatingsResponse),
        (status = 403, description = "Not a buyer, or rating ceiling reached", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Ratings"
)]
pub async fn add_rating(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: UserIdentity,
    Json(input): Json<RatingInput>,
) -> Result<Json<RatingsResponse>, ServiceError> {
    validate_input(&input)?;
    let updated_ratings = state.services.ratings.add(id, &user, input).await?;
    Ok(Json(RatingsResponse {
        message: "تمت إضافة التقييم بنجاح".to_string(),
        updated_ratings,
    }))
}

/// PUT /api/v1/products/:id/ratings/:rating_id
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}/ratings/{rating_id}",
    params(
        ("id" = Uuid, Path, description = "Product id"),
        ("rating_id" = Uuid, Path, description = "Rating id")
    ),
    request_body = RatingInput,
    responses(
        (status = 200, description = "Rating updated", body = RatingsResponse),
        (status = 404, description = "Rating missing or not owned", body = crate::errors::ErrorResponse)
    ),
    tag = "Ratings"
)]
pub async fn update_rating(
    State(state): State<AppState>,
    Path((id, rating_id)): Path<(Uuid, Uuid)>,
    user: UserIdentity,
    Json(input): Json<RatingInput>,
) -> Result<Json<RatingsResponse>, ServiceError> {
    validate_input(&input)?;
    let updated_ratings = state
        .services
        .ratings
        .update(id, rating_id, &user.email, input)
        .await?;
    Ok(Json(RatingsResponse {
        message: "تم تحديث التعليق بنجاح".to_string(),
        updated_ratings,
    }))
}

/// DELETE /api/v1/products/:id/ratings/:rating_id
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}/ratings/{rating_id}",
    params(
        ("id" = Uuid, Path, description = "Product id"),
        ("rating_id" = Uuid, Path, description = "Rating id")
    ),
    responses(
        (status = 200, description = "Rating deleted", body = RatingsResponse),
        (status = 404, description = "Rating missing or not owned", body = crate::errors::ErrorResponse)
    ),
    tag = "Ratings"
)]
pub async fn delete_rating(
    State(state): State<AppState>,
    Path((id, rating_id)): Path<(Uuid, Uuid)>,
    user: UserIdentity,
) -> Result<Json<RatingsResponse>, ServiceError> {
    let updated_ratings = state
        .services
        .ratings
        .delete(id, rating_id, &user.email)
        .await?;
    Ok(Json(RatingsResponse {
        message: "تم حذف التعليق بنجاح".to_string(),
        updated_ratings,
    }))
}
