use crate::{
    cart::{self, CartEntry},
    errors::ServiceError,
    properties::PropertySet,
    AppState,
};
use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EnrichCartRequest {
    /// Flat ledger entries, one per unit.
    #[serde(default)]
    pub items: Vec<CartEntry>,
}

/// A grouped cart line enriched with current catalog display data.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EnrichedLine {
    pub product_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub properties: PropertySet,
}

/// POST /api/v1/cart/enrich
///
/// Groups the client's flat entries and joins in the current product title
/// and image for cart review. Entries whose product vanished are dropped.
#[utoipa::path(
    post,
    path = "/api/v1/cart/enrich",
    request_body = EnrichCartRequest,
    responses((status = 200, description = "Grouped, display-ready cart lines", body = [EnrichedLine])),
    tag = "Cart"
)]
pub async fn enrich_cart(
    State(state): State<AppState>,
    Json(request): Json<EnrichCartRequest>,
) -> Result<Json<Vec<EnrichedLine>>, ServiceError> {
    if request.items.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let grouped = cart::group(&request.items);
    let ids: Vec<Uuid> = {
        let mut ids: Vec<_> = grouped.iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    };
    let products = state.services.catalog.find_with_variants(&ids).await?;

    let lines = grouped
        .into_iter()
        .filter_map(|line| {
            let (product, _) = products.iter().find(|(p, _)| p.id == line.product_id)?;
            Some(EnrichedLine {
                product_id: line.product_id,
                title: product.title.clone(),
                image: product.display_image(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                properties: line.properties,
            })
        })
        .collect();

    Ok(Json(lines))
}
