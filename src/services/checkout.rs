use crate::{
    cart::GroupedLine,
    config::AppConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    payment::{
        metadata::{self, CustomerDetails, MetadataError, MetadataLine, OrderMetadata},
        CreateSessionRequest, PaymentGateway, SessionLineItem,
    },
    properties::describe,
    services::catalog::ProductCatalogService,
};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Name and description of the flat delivery fee line item.
const SHIPPING_LINE_NAME: &str = "رسوم التوصيل";
const SHIPPING_LINE_DESCRIPTION: &str = "خدمة التوصيل";

/// Validated checkout input as assembled by the handler.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub customer: CustomerDetails,
    pub notes: Option<String>,
    pub lines: Vec<GroupedLine>,
}

/// Redirect target for the hosted payment page.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Converts a verified cart into a hosted payment session: provider line
/// items priced in minor units, a flat shipping fee line, and the
/// versioned order-reconstruction metadata the finalizer depends on.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<ProductCatalogService>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<AppConfig>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<ProductCatalogService>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            catalog,
            gateway,
            config,
            event_sender,
        }
    }

    /// Creates the hosted checkout session and returns its redirect URL.
    ///
    /// Lines whose product no longer exists are dropped from both the
    /// payment line items and the metadata, keeping the two views of the
    /// order aligned.
    #[instrument(skip(self, input), fields(lines = input.lines.len()))]
    pub async fn create_session(
        &self,
        input: CheckoutInput,
    ) -> Result<CheckoutResponse, ServiceError> {
        if input.lines.is_empty() {
            return Err(ServiceError::ValidationError("السلة فارغة".to_string()));
        }

        let ids: Vec<uuid::Uuid> = {
            let mut ids: Vec<_> = input.lines.iter().map(|l| l.product_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let products = self.catalog.find_with_variants(&ids).await?;

        let mut line_items = Vec::new();
        let mut metadata_lines = Vec::new();
        for line in &input.lines {
            let Some((product, _)) = products.iter().find(|(p, _)| p.id == line.product_id) else {
                continue;
            };

            let description = describe(&line.properties, ", ");
            line_items.push(SessionLineItem {
                name: product.title.clone(),
                description: (!description.is_empty()).then_some(description),
                currency: self.config.currency.clone(),
                unit_amount: to_minor_units(line.unit_price)?,
                quantity: line.quantity,
            });
            metadata_lines.push(MetadataLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                properties: line.properties.clone(),
            });
        }

        if line_items.is_empty() {
            return Err(ServiceError::ValidationError(
                "لا توجد منتجات صالحة في السلة".to_string(),
            ));
        }

        // Flat delivery fee as one extra line item
        line_items.push(SessionLineItem {
            name: SHIPPING_LINE_NAME.to_string(),
            description: Some(SHIPPING_LINE_DESCRIPTION.to_string()),
            currency: self.config.currency.clone(),
            unit_amount: self.config.shipping_fee_minor,
            quantity: 1,
        });

        let order_metadata = OrderMetadata {
            version: metadata::METADATA_VERSION,
            lines: metadata_lines,
            customer: input.customer.clone(),
            notes: input.notes.clone(),
        };
        let metadata = metadata::encode(&order_metadata).map_err(|err| match err {
            MetadataError::TooLarge { .. } => ServiceError::ValidationError(
                "السلة كبيرة جداً، يرجى تقسيم الطلب".to_string(),
            ),
            other => ServiceError::SerializationError(other.to_string()),
        })?;

        let session = self
            .gateway
            .create_checkout_session(CreateSessionRequest {
                line_items,
                customer_email: input.customer.email.clone(),
                success_url: format!("{}/paysuccess", self.config.store_url),
                cancel_url: format!("{}/cart", self.config.store_url),
                metadata,
            })
            .await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                session_id: session.id.clone(),
            })
            .await;

        info!("Created checkout session {}", session.id);
        Ok(CheckoutResponse { url: session.url })
    }
}

/// Major-unit price to provider minor units: multiply by 100 and round
/// half away from zero.
fn to_minor_units(price: Decimal) -> Result<i64, ServiceError> {
    (price * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("سعر غير صالح".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(49.99)).unwrap(), 4999);
        assert_eq!(to_minor_units(dec!(10)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(0.005)).unwrap(), 1);
        assert_eq!(to_minor_units(dec!(19.994)).unwrap(), 1999);
        assert_eq!(to_minor_units(dec!(19.995)).unwrap(), 2000);
    }
}
