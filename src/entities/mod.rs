pub mod order;
pub mod order_item;
pub mod product;
pub mod product_rating;
pub mod product_variant;

// Re-export entities
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_rating::{Entity as ProductRating, Model as ProductRatingModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
