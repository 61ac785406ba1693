use crate::{
    db::DbPool,
    entities::{order, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// An order with its immutable item snapshots.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Shipping prefill derived from the customer's latest order.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub address2: Option<String>,
    pub state: Option<String>,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub has_order: bool,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateShippingInput {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub address2: Option<String>,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub country: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
}

/// Order history and status queries. Orders are created exclusively by the
/// finalizer; this service never inserts or deletes them.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Paginated order history for a customer email, newest first.
    #[instrument(skip(self))]
    pub async fn list_by_email(
        &self,
        email: &str,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::Email.eq(email))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = order.find_related(OrderItem).all(&*self.db).await?;
            responses.push(OrderResponse { order, items });
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page: page.max(1),
            per_page: per_page.max(1),
        })
    }

    /// Fetches one order with its items.
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("الطلب غير موجود".to_string()))?;
        let items = order.find_related(OrderItem).all(&*self.db).await?;
        Ok(OrderResponse { order, items })
    }

    /// Moves an order along pending → processing → shipped → delivered.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("الطلب غير موجود".to_string()))?;

        let old_status = order.status;
        let mut update: order::ActiveModel = order.into();
        update.status = Set(new_status);
        update.updated_at = Set(Utc::now());
        let updated = update.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: id,
                old_status: format!("{:?}", old_status).to_lowercase(),
                new_status: format!("{:?}", new_status).to_lowercase(),
            })
            .await;

        info!("Order {} status {:?} -> {:?}", id, old_status, new_status);
        Ok(updated)
    }

    /// Shipping prefill from the customer's latest order; empty fields and
    /// `has_order = false` when the customer has never ordered.
    #[instrument(skip(self))]
    pub async fn latest_shipping_info(&self, email: &str) -> Result<ShippingInfo, ServiceError> {
        let last = self.latest_order(email).await?;

        Ok(match last {
            Some(order) => ShippingInfo {
                first_name: order.first_name,
                last_name: order.last_name,
                email: order.email,
                phone: order.phone,
                address: order.address,
                address2: order.address2,
                state: order.state,
                city: order.city,
                country: order.country,
                postal_code: order.postal_code,
                has_order: true,
            },
            None => ShippingInfo {
                first_name: String::new(),
                last_name: String::new(),
                email: email.to_string(),
                phone: String::new(),
                address: String::new(),
                address2: None,
                state: None,
                city: String::new(),
                country: String::new(),
                postal_code: String::new(),
                has_order: false,
            },
        })
    }

    /// Updates the shipping fields on the customer's latest order, which
    /// doubles as their saved shipping profile.
    #[instrument(skip(self, input))]
    pub async fn update_shipping_info(
        &self,
        email: &str,
        input: UpdateShippingInput,
    ) -> Result<OrderModel, ServiceError> {
        let last = self.latest_order(email).await?.ok_or_else(|| {
            ServiceError::Forbidden(
                "لا يوجد طلب سابق، لا يمكن تحديث معلومات الشحن".to_string(),
            )
        })?;

        let mut update: order::ActiveModel = last.into();
        update.first_name = Set(input.first_name);
        update.last_name = Set(input.last_name);
        update.phone = Set(input.phone);
        update.address = Set(input.address);
        update.address2 = Set(input.address2);
        update.state = Set(input.state);
        update.city = Set(input.city);
        update.country = Set(input.country);
        update.postal_code = Set(input.postal_code);
        update.updated_at = Set(Utc::now());

        Ok(update.update(&*self.db).await?)
    }

    async fn latest_order(&self, email: &str) -> Result<Option<OrderModel>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::Email.eq(email))
            .order_by_desc(order::Column::CreatedAt)
            .one(&*self.db)
            .await?)
    }
}
