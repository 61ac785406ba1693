use crate::{
    db::DbPool,
    entities::{product, Product, ProductVariant},
    errors::ServiceError,
    properties::{canonical_key, describe, matches, PropertySet},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A proposed purchase line as submitted by the client cart.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct PurchaseLine {
    pub product_id: Uuid,
    #[serde(default)]
    pub properties: PropertySet,
    pub quantity: u32,
}

/// Structured verification result. Shortfalls are reported here, never as
/// errors, so callers can redirect the customer back to cart review.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
}

impl VerificationOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            message: "تم التحقق من المخزون بنجاح".to_string(),
        }
    }

    fn shortfall(title: &str, properties: &PropertySet, requested: u32, available: i32) -> Self {
        Self {
            success: false,
            message: format!(
                "{} ({}) - الكمية المطلوبة {} والمتوفر {} قطع",
                title,
                describe(properties, " - "),
                requested,
                available.max(0)
            ),
        }
    }
}

/// Read-only pre-checkout gate: resolves each proposed line group against
/// live variant stock and reports the first shortfall.
///
/// No stock is reserved; between this check and order finalization other
/// carts may deplete the same variants.
#[derive(Clone)]
pub struct StockVerifier {
    db: Arc<DbPool>,
}

struct LineGroup {
    product_id: Uuid,
    properties: PropertySet,
    requested: u32,
}

impl StockVerifier {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Verifies the proposed purchase lines against current stock.
    ///
    /// Lines naming the same product with an identically-serializing
    /// property-set are summed before checking, so the same variant split
    /// across several cart entries cannot slip past the bound. Lines whose
    /// product no longer exists are skipped.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn verify(&self, lines: &[PurchaseLine]) -> Result<VerificationOutcome, ServiceError> {
        let groups = group_lines(lines);
        if groups.is_empty() {
            return Ok(VerificationOutcome::ok());
        }

        let ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = groups.iter().map(|g| g.product_id).collect();
            ids.dedup();
            ids
        };

        let products = Product::find()
            .filter(product::Column::Id.is_in(ids))
            .find_with_related(ProductVariant)
            .all(&*self.db)
            .await?;

        for group in &groups {
            let Some((product, variants)) =
                products.iter().find(|(p, _)| p.id == group.product_id)
            else {
                continue;
            };

            let variant = variants
                .iter()
                .find(|v| matches(&v.property_set(), &group.properties));

            match variant {
                Some(variant) if variant.stock >= group.requested as i32 => {}
                Some(variant) => {
                    return Ok(VerificationOutcome::shortfall(
                        &product.title,
                        &group.properties,
                        group.requested,
                        variant.stock,
                    ));
                }
                None => {
                    return Ok(VerificationOutcome::shortfall(
                        &product.title,
                        &group.properties,
                        group.requested,
                        0,
                    ));
                }
            }
        }

        Ok(VerificationOutcome::ok())
    }
}

/// Groups lines by (product id, canonical property serialization), summing
/// quantities. BTreeMap keys make the grouping independent of line order.
fn group_lines(lines: &[PurchaseLine]) -> Vec<LineGroup> {
    let mut groups: BTreeMap<(Uuid, String), LineGroup> = BTreeMap::new();
    for line in lines {
        groups
            .entry((line.product_id, canonical_key(&line.properties)))
            .and_modify(|g| g.requested += line.quantity)
            .or_insert_with(|| LineGroup {
                product_id: line.product_id,
                properties: line.properties.clone(),
                requested: line.quantity,
            });
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, pairs: &[(&str, &str)], quantity: u32) -> PurchaseLine {
        PurchaseLine {
            product_id,
            properties: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            quantity,
        }
    }

    #[test]
    fn grouping_sums_matching_lines() {
        let id = Uuid::new_v4();
        let lines = vec![
            line(id, &[("color", "red")], 1),
            line(id, &[("color", "red")], 2),
            line(id, &[("color", "blue")], 1),
        ];
        let groups = group_lines(&lines);
        assert_eq!(groups.len(), 2);
        let red = groups
            .iter()
            .find(|g| g.properties.get("color").map(String::as_str) == Some("red"))
            .unwrap();
        assert_eq!(red.requested, 3);
    }

    #[test]
    fn grouping_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let forward = vec![
            line(a, &[("color", "red")], 1),
            line(b, &[("size", "small")], 2),
            line(a, &[("color", "red")], 1),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let key = |groups: Vec<LineGroup>| -> Vec<(Uuid, String, u32)> {
            groups
                .into_iter()
                .map(|g| (g.product_id, canonical_key(&g.properties), g.requested))
                .collect()
        };

        assert_eq!(key(group_lines(&forward)), key(group_lines(&backward)));
    }
}
