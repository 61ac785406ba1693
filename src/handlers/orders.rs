use crate::{
    entities::{OrderModel, OrderStatus},
    errors::ServiceError,
    handlers::common::validate_input,
    services::orders::{OrderListResponse, OrderResponse, ShippingInfo, UpdateShippingInput},
    services::ratings::UserIdentity,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct OrderListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// GET /api/v1/orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListParams),
    responses(
        (status = 200, description = "Order history for the authenticated customer", body = OrderListResponse),
        (status = 401, description = "No identity", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: UserIdentity,
    Query(params): Query<OrderListParams>,
) -> Result<Json<OrderListResponse>, ServiceError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let response = state
        .services
        .orders
        .list_by_email(&user.email, page, per_page)
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/orders/:id
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with item snapshots", body = OrderResponse),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    Ok(Json(state.services.orders.get(id).await?))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// PUT /api/v1/orders/:id/status
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderModel),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderModel>, ServiceError> {
    let updated = state
        .services
        .orders
        .update_status(id, request.status)
        .await?;
    Ok(Json(updated))
}

/// GET /api/v1/shipping
#[utoipa::path(
    get,
    path = "/api/v1/shipping",
    responses(
        (status = 200, description = "Shipping prefill from the latest order", body = ShippingInfo),
        (status = 401, description = "No identity", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping"
)]
pub async fn get_shipping_info(
    State(state): State<AppState>,
    user: UserIdentity,
) -> Result<Json<ShippingInfo>, ServiceError> {
    Ok(Json(
        state.services.orders.latest_shipping_info(&user.email).await?,
    ))
}

/// PUT /api/v1/shipping
#[utoipa::path(
    put,
    path = "/api/v1/shipping",
    request_body = UpdateShippingInput,
    responses(
        (status = 200, description = "Updated latest order", body = OrderModel),
        (status = 403, description = "No previous order", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping"
)]
pub async fn update_shipping_info(
    State(state): State<AppState>,
    user: UserIdentity,
    Json(input): Json<UpdateShippingInput>,
) -> Result<Json<OrderModel>, ServiceError> {
    validate_input(&input)?;
    let updated = state
        .services
        .orders
        .update_shipping_info(&user.email, input)
        .await?;
    Ok(Json(updated))
}
