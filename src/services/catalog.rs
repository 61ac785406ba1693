use crate::{
    db::DbPool,
    entities::{
        product, product_rating, product_variant, Product, ProductModel, ProductRating,
        ProductRatingModel, ProductVariant, ProductVariantModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    properties::PropertySet,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Catalog service: product creation with slug assignment, lookup by slug
/// or id, paginated listing, and the bulk product+variant fetch the
/// checkout path relies on.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, message = "العنوان مطلوب"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Stock for products sold without variants.
    pub stock: Option<i32>,
    #[serde(default)]
    pub variants: Vec<CreateVariantInput>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateVariantInput {
    #[serde(default)]
    pub properties: PropertySet,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: i32,
}

/// Product with its variants and ratings, as served to product pages.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductModel,
    pub variants: Vec<ProductVariantModel>,
    pub ratings: Vec<ProductRatingModel>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a product and its variants.
    ///
    /// The slug is derived from the title; on collision a numeric suffix
    /// is appended until the slug is unique.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let txn = self.db.begin().await?;

        let product_id = Uuid::new_v4();
        let now = Utc::now();
        let slug = self.unique_slug(&txn, &slugify(&input.title)).await?;

        let model = product::ActiveModel {
            id: Set(product_id),
            title: Set(input.title),
            slug: Set(slug),
            description: Set(input.description),
            images: Set(serde_json::to_value(&input.images)?),
            stock: Set(input.stock),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await?;

        for (position, variant) in input.variants.into_iter().enumerate() {
            let model = product_variant::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                properties: Set(serde_json::to_value(&variant.properties)?),
                price: Set(variant.price),
                cost: Set(variant.cost),
                stock: Set(variant.stock),
                position: Set(position as i32),
                created_at: Set(now),
                updated_at: Set(now),
            };
            model.insert(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product {} ({})", created.slug, product_id);
        Ok(created)
    }

    /// Fetches a product by slug with its variants and ratings.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let product = Product::find()
            .filter(product::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("المنتج غير موجود".to_string()))?;

        self.load_detail(product).await
    }

    /// Fetches a product by id with its variants and ratings.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("المنتج غير موجود".to_string()))?;

        self.load_detail(product).await
    }

    /// Paginated catalog listing, newest first, with optional title
    /// search.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut query = Product::find().order_by_desc(product::Column::CreatedAt);
        if let Some(term) = search.filter(|t| !t.trim().is_empty()) {
            query = query.filter(product::Column::Title.contains(term.trim()));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((products, total))
    }

    /// Bulk-fetches the named products with their variants; unknown ids
    /// are simply absent from the result.
    pub async fn find_with_variants(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<(ProductModel, Vec<ProductVariantModel>)>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .find_with_related(ProductVariant)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    async fn load_detail(&self, product: ProductModel) -> Result<ProductDetail, ServiceError> {
        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product.id))
            .order_by_asc(product_variant::Column::Position)
            .all(&*self.db)
            .await?;
        let ratings = ProductRating::find()
            .filter(product_rating::Column::ProductId.eq(product.id))
            .order_by_desc(product_rating::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(ProductDetail {
            product,
            variants,
            ratings,
        })
    }

    async fn unique_slug<C: ConnectionTrait>(
        &self,
        conn: &C,
        base: &str,
    ) -> Result<String, ServiceError> {
        let mut slug = base.to_string();
        let mut counter = 1u32;
        loop {
            let taken = Product::find()
                .filter(product::Column::Slug.eq(slug.clone()))
                .one(conn)
                .await?
                .is_some();
            if !taken {
                return Ok(slug);
            }
            slug = format!("{}-{}", base, counter);
            counter += 1;
        }
    }
}

/// Derives a URL slug from a product title: whitespace collapses to a
/// single hyphen; Arabic letters, ASCII alphanumerics and hyphens are
/// kept; ASCII is lowercased.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // suppress leading hyphens
    for ch in title.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            if !last_was_hyphen {
                slug.push('-');
                last_was_hyphen = true;
            }
        } else if ('\u{0600}'..='\u{06FF}').contains(&ch) || ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_keeps_arabic_and_alphanumerics() {
        assert_eq!(slugify("قميص صيفي"), "قميص-صيفي");
        assert_eq!(slugify("Summer Shirt 2"), "summer-shirt-2");
    }

    #[test]
    fn slugify_strips_punctuation_and_extra_whitespace() {
        assert_eq!(slugify("  قميص   (جديد)!  "), "قميص-جديد");
        assert_eq!(slugify("A  B"), "a-b");
    }

    #[test]
    fn slugify_has_no_edge_hyphens() {
        assert_eq!(slugify("- حذاء -"), "حذاء");
    }
}
