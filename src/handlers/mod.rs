pub mod cart;
pub mod checkout;
pub mod common;
pub mod health;
pub mod orders;
pub mod products;
pub mod ratings;
pub mod stock;
pub mod webhooks;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    payment::PaymentGateway,
    services::{
        CheckoutService, OrderFinalizer, OrderService, ProductCatalogService, RatingService,
        StockVerifier,
    },
    AppState,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub stock: Arc<StockVerifier>,
    pub checkout: Arc<CheckoutService>,
    pub finalizer: Arc<OrderFinalizer>,
    pub orders: Arc<OrderService>,
    pub ratings: Arc<RatingService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog = Arc::new(ProductCatalogService::new(db.clone(), event_sender.clone()));
        let stock = Arc::new(StockVerifier::new(db.clone()));
        let checkout = Arc::new(CheckoutService::new(
            catalog.clone(),
            gateway,
            config.clone(),
            event_sender.clone(),
        ));
        let finalizer = Arc::new(OrderFinalizer::new(
            db.clone(),
            config,
            event_sender.clone(),
        ));
        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let ratings = Arc::new(RatingService::new(db, event_sender));

        Self {
            catalog,
            stock,
            checkout,
            finalizer,
            orders,
            ratings,
        }
    }
}

/// Routes under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/:slug", get(products::get_product))
        // Same param name as the sibling route: the router requires
        // matching names at a shared position. Ratings bind it as the
        // product id.
        .route(
            "/products/:slug/ratings",
            get(ratings::list_ratings).post(ratings::add_rating),
        )
        .route(
            "/products/:slug/ratings/:rating_id",
            put(ratings::update_rating).delete(ratings::delete_rating),
        )
        .route("/cart/enrich", post(cart::enrich_cart))
        .route("/stock/verify", post(stock::verify_stock))
        .route("/checkout", post(checkout::create_checkout_session))
        .route("/payments/webhook", post(webhooks::payment_webhook))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_order_status))
        .route(
            "/shipping",
            get(orders::get_shipping_info).put(orders::update_shipping_info),
        )
}
