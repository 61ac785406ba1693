use utoipa::OpenApi;

/// Aggregated OpenAPI documentation, served through Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::ratings::list_ratings,
        crate::handlers::ratings::add_rating,
        crate::handlers::ratings::update_rating,
        crate::handlers::ratings::delete_rating,
        crate::handlers::cart::enrich_cart,
        crate::handlers::stock::verify_stock,
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::webhooks::payment_webhook,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::get_shipping_info,
        crate::handlers::orders::update_shipping_info,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::ProductModel,
        crate::entities::ProductVariantModel,
        crate::entities::ProductRatingModel,
        crate::entities::OrderModel,
        crate::entities::OrderItemModel,
        crate::entities::OrderStatus,
        crate::cart::CartEntry,
        crate::cart::GroupedLine,
        crate::services::stock::PurchaseLine,
        crate::services::stock::VerificationOutcome,
        crate::services::checkout::CheckoutResponse,
        crate::services::catalog::CreateProductInput,
        crate::services::catalog::CreateVariantInput,
        crate::services::catalog::ProductDetail,
        crate::services::orders::OrderResponse,
        crate::services::orders::OrderListResponse,
        crate::services::orders::ShippingInfo,
        crate::services::orders::UpdateShippingInput,
        crate::services::ratings::RatingInput,
        crate::handlers::products::ProductListResponse,
        crate::handlers::cart::EnrichCartRequest,
        crate::handlers::cart::EnrichedLine,
        crate::handlers::stock::VerifyStockRequest,
        crate::handlers::checkout::CheckoutRequest,
        crate::handlers::orders::UpdateStatusRequest,
        crate::handlers::ratings::RatingsResponse,
    )),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Products", description = "Catalog browsing and creation"),
        (name = "Ratings", description = "Buyer product ratings"),
        (name = "Cart", description = "Client cart support"),
        (name = "Stock", description = "Pre-checkout stock verification"),
        (name = "Checkout", description = "Hosted payment session creation"),
        (name = "Payments", description = "Payment provider notifications"),
        (name = "Orders", description = "Order history and status"),
        (name = "Shipping", description = "Saved shipping information")
    ),
    info(
        title = "souq-api",
        description = "Backend for an Arabic-language online storefront"
    )
)]
pub struct ApiDoc;
