use crate::{
    db::DbPool,
    entities::{
        order, order_item, product_rating, OrderItem, Product, ProductRating, ProductRatingModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Ratings per (product, user email) ceiling.
const MAX_RATINGS_PER_USER: u64 = 3;

/// Identity of the storefront user as injected by the fronting auth layer.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct RatingInput {
    #[validate(range(min = 1, max = 5, message = "التقييم يجب أن يكون بين 1 و 5"))]
    pub rating: i16,
    pub review: Option<String>,
}

/// Product ratings, restricted to buyers: a user may rate a product only
/// after an order of theirs contains it, at most three times, and may edit
/// or delete only their own ratings.
#[derive(Clone)]
pub struct RatingService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl RatingService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Ratings for a product, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self, product_id: Uuid) -> Result<Vec<ProductRatingModel>, ServiceError> {
        self.require_product(product_id).await?;
        Ok(ProductRating::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .order_by_desc(product_rating::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Adds a rating, enforcing the buyer gate and the per-user ceiling.
    /// Returns the product's updated rating list.
    #[instrument(skip(self, user, input), fields(user_email = %user.email))]
    pub async fn add(
        &self,
        product_id: Uuid,
        user: &UserIdentity,
        input: RatingInput,
    ) -> Result<Vec<ProductRatingModel>, ServiceError> {
        self.require_product(product_id).await?;

        let existing = ProductRating::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .filter(product_rating::Column::UserEmail.eq(user.email.clone()))
            .count(&*self.db)
            .await?;
        if existing >= MAX_RATINGS_PER_USER {
            return Err(ServiceError::Forbidden(
                "لقد وصلت إلى الحد الأقصى المسموح به من التعليقات (3 تعليقات)".to_string(),
            ));
        }

        if !self.has_purchased(product_id, &user.email).await? {
            return Err(ServiceError::Forbidden(
                "لا يمكنك وضع تعليق قبل شراء المنتج".to_string(),
            ));
        }

        let model = product_rating::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            rating: Set(input.rating),
            review: Set(input.review),
            user_name: Set(user.name.clone()),
            user_email: Set(user.email.clone()),
            user_image: Set(user.image.clone()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::RatingAdded {
                product_id,
                user_email: user.email.clone(),
            })
            .await;

        info!("Rating added on product {} by {}", product_id, user.email);
        self.list(product_id).await
    }

    /// Edits the caller's own rating. Returns the updated rating list.
    #[instrument(skip(self, input), fields(user_email = %user_email))]
    pub async fn update(
        &self,
        product_id: Uuid,
        rating_id: Uuid,
        user_email: &str,
        input: RatingInput,
    ) -> Result<Vec<ProductRatingModel>, ServiceError> {
        let rating = self
            .owned_rating(product_id, rating_id, user_email)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(
                    "التعليق غير موجود أو غير مصرح لك بتعديله".to_string(),
                )
            })?;

        let mut update: product_rating::ActiveModel = rating.into();
        update.rating = Set(input.rating);
        update.review = Set(input.review);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await?;

        self.list(product_id).await
    }

    /// Deletes the caller's own rating. Returns the updated rating list.
    #[instrument(skip(self), fields(user_email = %user_email))]
    pub async fn delete(
        &self,
        product_id: Uuid,
        rating_id: Uuid,
        user_email: &str,
    ) -> Result<Vec<ProductRatingModel>, ServiceError> {
        let rating = self
            .owned_rating(product_id, rating_id, user_email)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(
                    "التعليق غير موجود أو غير مصرح لك بحذفه".to_string(),
                )
            })?;

        rating.delete(&*self.db).await?;
        self.list(product_id).await
    }

    async fn require_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound("المنتج غير موجود".to_string()))
    }

    async fn owned_rating(
        &self,
        product_id: Uuid,
        rating_id: Uuid,
        user_email: &str,
    ) -> Result<Option<ProductRatingModel>, ServiceError> {
        Ok(ProductRating::find_by_id(rating_id)
            .filter(product_rating::Column::ProductId.eq(product_id))
            .filter(product_rating::Column::UserEmail.eq(user_email))
            .one(&*self.db)
            .await?)
    }

    /// True when any of the user's orders contains the product.
    async fn has_purchased(&self, product_id: Uuid, email: &str) -> Result<bool, ServiceError> {
        let count = OrderItem::find()
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(order_item::Column::ProductId.eq(product_id))
            .filter(order::Column::Email.eq(email))
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }
}
