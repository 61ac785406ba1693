use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product entity for the storefront catalog
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Object)]
    pub images: Json, // Vec<String> serialized
    /// Stock for products sold without variants; variant stock is
    /// authoritative whenever variants exist.
    #[sea_orm(nullable)]
    pub stock: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_variant::Entity")]
    ProductVariants,
    #[sea_orm(has_many = "super::product_rating::Entity")]
    ProductRatings,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariants.def()
    }
}

impl Related<super::product_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductRatings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Image URL list stored in the `images` Json column.
    pub fn image_list(&self) -> Vec<String> {
        serde_json::from_value(self.images.clone()).unwrap_or_default()
    }

    /// First image, used as the display image on order item snapshots.
    pub fn display_image(&self) -> Option<String> {
        self.image_list().into_iter().next()
    }
}
