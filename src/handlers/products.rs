use crate::{
    entities::ProductModel,
    errors::ServiceError,
    handlers::common::{created_response, validate_input},
    services::catalog::{CreateProductInput, ProductDetail},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// GET /api/v1/products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ListParams),
    responses((status = 200, description = "Paginated catalog listing", body = ProductListResponse)),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductListResponse>, ServiceError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let (products, total) = state
        .services
        .catalog
        .list(page, per_page, params.search)
        .await?;

    Ok(Json(ProductListResponse {
        products,
        total,
        page,
        per_page,
    }))
}

/// POST /api/v1/products
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<Response, ServiceError> {
    validate_input(&input)?;
    let product = state.services.catalog.create_product(input).await?;
    Ok(created_response(product))
}

/// GET /api/v1/products/:slug
#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product with variants and ratings", body = ProductDetail),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>, ServiceError> {
    let detail = state.services.catalog.get_by_slug(&slug).await?;
    Ok(Json(detail))
}
