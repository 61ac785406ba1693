use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{order, order_item, product, product_variant, Order, OrderStatus, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    payment::{
        metadata::{self, MetadataLine},
        webhook::{CheckoutSessionObject, WebhookEvent, CHECKOUT_SESSION_COMPLETED,
            PAYMENT_STATUS_PAID},
    },
    properties::matches,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// What a completion notification amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Event type or payment status did not call for finalization.
    Ignored,
    /// An order for this payment reference already exists; nothing was
    /// created or decremented.
    AlreadyProcessed,
    /// A new order was persisted and stock decremented.
    Completed { order_id: Uuid },
}

/// Reacts to payment-completion notifications: reconstructs the order from
/// session metadata, persists it, and decrements matched variant stock.
///
/// The whole finalization (idempotency check, order insert, item inserts,
/// and every stock decrement) runs in one database transaction, so a
/// mid-order failure rolls back completely and the provider's retry starts
/// from a clean slate.
#[derive(Clone)]
pub struct OrderFinalizer {
    db: Arc<DbPool>,
    config: Arc<AppConfig>,
    event_sender: Arc<EventSender>,
}

impl OrderFinalizer {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db,
            config,
            event_sender,
        }
    }

    /// Handles a verified completion notification.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_event(&self, event: WebhookEvent) -> Result<FinalizeOutcome, ServiceError> {
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            info!("Ignoring webhook event type {}", event.event_type);
            return Ok(FinalizeOutcome::Ignored);
        }

        let session = event.data.object;
        if session.payment_status != PAYMENT_STATUS_PAID {
            info!(
                "Session {} not paid (status {}), no action",
                session.id, session.payment_status
            );
            return Ok(FinalizeOutcome::Ignored);
        }

        self.finalize(session).await
    }

    async fn finalize(
        &self,
        session: CheckoutSessionObject,
    ) -> Result<FinalizeOutcome, ServiceError> {
        let payload = metadata::decode(&session.metadata)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        let payment_reference = session.payment_reference().to_string();

        let txn = self.db.begin().await?;

        // Idempotency: a replayed notification must not create a second
        // order nor decrement stock twice.
        let existing = Order::find()
            .filter(order::Column::PaymentReference.eq(payment_reference.clone()))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            txn.rollback().await?;
            info!(
                "Payment {} already finalized as order {}, skipping",
                payment_reference, existing.id
            );
            self.event_sender
                .send_or_log(Event::OrderReplayed { payment_reference })
                .await;
            return Ok(FinalizeOutcome::AlreadyProcessed);
        }

        let shipping_cost = self.config.shipping_fee();
        let total_amount: Decimal = payload
            .lines
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum::<Decimal>()
            + shipping_cost;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let customer = payload.customer;
        let order = order::ActiveModel {
            id: Set(order_id),
            first_name: Set(customer.first_name),
            last_name: Set(customer.last_name),
            email: Set(customer.email),
            phone: Set(customer.phone),
            address: Set(customer.address),
            address2: Set(customer.address2),
            state: Set(customer.state),
            city: Set(customer.city),
            country: Set(customer.country),
            postal_code: Set(customer.postal_code),
            notes: Set(payload.notes),
            total_amount: Set(total_amount),
            shipping_cost: Set(shipping_cost),
            paid: Set(true),
            payment_reference: Set(Some(payment_reference.clone())),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        };
        order.insert(&txn).await?;

        // Events are collected and sent only after the transaction commits.
        let mut events = Vec::new();
        for line in &payload.lines {
            self.persist_item_and_decrement(&txn, order_id, line, &mut events)
                .await?;
        }

        txn.commit().await?;

        events.push(Event::OrderCreated(order_id));
        for event in events {
            self.event_sender.send_or_log(event).await;
        }

        info!(
            "Finalized payment {} as order {}",
            payment_reference, order_id
        );
        Ok(FinalizeOutcome::Completed { order_id })
    }

    /// Persists the item snapshot and decrements the matched variant's
    /// stock (or the product's top-level stock when it has no variants).
    ///
    /// Stock clamps at zero: with no reservation between verification and
    /// payment, concurrent checkouts can oversell the last units, and a
    /// paid order must still be recorded. The clamp is logged.
    async fn persist_item_and_decrement(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        line: &MetadataLine,
        events: &mut Vec<Event>,
    ) -> Result<(), ServiceError> {
        let product = Product::find_by_id(line.product_id).one(txn).await?;

        let (title, image) = match &product {
            Some(p) => (p.title.clone(), p.display_image()),
            None => {
                warn!(
                    "Product {} missing at finalization, keeping snapshot only",
                    line.product_id
                );
                (line.product_id.to_string(), None)
            }
        };

        let item = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            title: Set(title),
            quantity: Set(line.quantity as i32),
            unit_price: Set(line.unit_price),
            properties: Set(serde_json::to_value(&line.properties)?),
            image: Set(image),
            created_at: Set(Utc::now()),
        };
        item.insert(txn).await?;

        let Some(product) = product else {
            return Ok(());
        };

        let variants = product.find_related(crate::entities::ProductVariant).all(txn).await?;
        if variants.is_empty() {
            // Variant-less product: the top-level stock field is the
            // authoritative count.
            let current = product.stock.unwrap_or(0);
            let new_stock = decremented(current, line.quantity as i32, product.id, None);
            let mut update: product::ActiveModel = product.clone().into();
            update.stock = Set(Some(new_stock));
            update.updated_at = Set(Utc::now());
            update.update(txn).await?;
            events.push(Event::StockDecremented {
                product_id: product.id,
                variant_id: None,
                quantity: line.quantity as i32,
                new_stock,
            });
            return Ok(());
        }

        let Some(variant) = variants
            .iter()
            .find(|v| matches(&v.property_set(), &line.properties))
        else {
            warn!(
                "No variant of product {} matches purchased properties, stock untouched",
                product.id
            );
            return Ok(());
        };

        let new_stock = decremented(
            variant.stock,
            line.quantity as i32,
            product.id,
            Some(variant.id),
        );
        let mut update: product_variant::ActiveModel = variant.clone().into();
        update.stock = Set(new_stock);
        update.updated_at = Set(Utc::now());
        update.update(txn).await?;

        events.push(Event::StockDecremented {
            product_id: product.id,
            variant_id: Some(variant.id),
            quantity: line.quantity as i32,
            new_stock,
        });

        Ok(())
    }
}

fn decremented(current: i32, quantity: i32, product_id: Uuid, variant_id: Option<Uuid>) -> i32 {
    let new_stock = current - quantity;
    if new_stock < 0 {
        warn!(
            %product_id,
            ?variant_id,
            current,
            quantity,
            "oversold: decrement would drive stock below zero, clamping to 0"
        );
        return 0;
    }
    new_stock
}
