mod common;

use common::{props, TestApp, WEBHOOK_SECRET};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use souq_api::{
    entities::{order, product_variant, Order, OrderItem, ProductVariant},
    payment::{
        metadata::{self, CustomerDetails, MetadataLine, OrderMetadata},
        signature_header,
    },
    properties::PropertySet,
};
use std::collections::BTreeMap;
use uuid::Uuid;

fn customer() -> CustomerDetails {
    CustomerDetails {
        first_name: "أحمد".into(),
        last_name: "الخطيب".into(),
        email: "ahmad@example.com".into(),
        phone: "+971501234567".into(),
        address: "شارع الشيخ زايد".into(),
        address2: None,
        state: None,
        city: "دبي".into(),
        country: "الإمارات".into(),
        postal_code: "00000".into(),
    }
}

fn encoded_metadata(lines: Vec<MetadataLine>) -> BTreeMap<String, String> {
    metadata::encode(&OrderMetadata {
        version: metadata::METADATA_VERSION,
        lines,
        customer: customer(),
        notes: None,
    })
    .expect("metadata must encode")
}

fn line(product_id: Uuid, quantity: u32, properties: PropertySet) -> MetadataLine {
    MetadataLine {
        product_id,
        quantity,
        unit_price: dec!(49.99),
        properties,
    }
}

fn event_body(
    event_type: &str,
    payment_status: &str,
    payment_intent: &str,
    metadata: &BTreeMap<String, String>,
) -> Vec<u8> {
    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": event_type,
        "data": {
            "object": {
                "id": format!("cs_{}", Uuid::new_v4().simple()),
                "payment_status": payment_status,
                "payment_intent": payment_intent,
                "metadata": metadata
            }
        }
    })
    .to_string()
    .into_bytes()
}

async fn post_signed(app: &TestApp, body: &[u8]) -> (axum::http::StatusCode, serde_json::Value) {
    let header = signature_header(body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    app.request_raw(
        "POST",
        "/api/v1/payments/webhook",
        body.to_vec(),
        &[("stripe-signature", header.as_str())],
    )
    .await
}

async fn variant_stock(app: &TestApp, product_id: Uuid) -> i32 {
    ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
async fn paid_session_creates_order_and_decrements_stock() {
    let app = TestApp::new().await;
    let red_large = props(&[("اللون", "أحمر"), ("المقاس", "كبير")]);
    let product = app
        .seed_product("قميص صيفي", &[(red_large.clone(), dec!(49.99), 2)])
        .await;

    let meta = encoded_metadata(vec![line(product.id, 2, red_large.clone())]);
    let body = event_body("checkout.session.completed", "paid", "pi_100", &meta);
    let (status, response) = post_signed(&app, &body).await;

    assert_eq!(status, 200);
    assert_eq!(response["received"], true);

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert!(order.paid);
    assert_eq!(order.status, souq_api::entities::OrderStatus::Pending);
    assert_eq!(order.payment_reference.as_deref(), Some("pi_100"));
    assert_eq!(order.shipping_cost, dec!(20.00));
    // 2 × 49.99 + 20.00 delivery
    assert_eq!(order.total_amount, dec!(119.98));
    assert_eq!(order.first_name, "أحمد");

    let items = OrderItem::find().all(&*app.state.db).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "قميص صيفي");
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].unit_price, dec!(49.99));
    assert_eq!(items[0].property_set(), red_large);

    assert_eq!(variant_stock(&app, product.id).await, 0);
}

#[tokio::test]
async fn replayed_notification_is_idempotent() {
    let app = TestApp::new().await;
    let blue = props(&[("اللون", "أزرق")]);
    let product = app.seed_product("جاكيت", &[(blue.clone(), dec!(49.99), 5)]).await;

    let meta = encoded_metadata(vec![line(product.id, 1, blue)]);
    let body = event_body("checkout.session.completed", "paid", "pi_replay", &meta);

    let (status, _) = post_signed(&app, &body).await;
    assert_eq!(status, 200);
    let (status, response) = post_signed(&app, &body).await;
    assert_eq!(status, 200);
    assert_eq!(response["received"], true);

    let count = Order::find()
        .filter(order::Column::PaymentReference.eq("pi_replay"))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(count, 1, "replay must not create a second order");
    assert_eq!(
        variant_stock(&app, product.id).await,
        4,
        "replay must not decrement stock twice"
    );
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let black = props(&[("اللون", "أسود")]);
    let product = app.seed_product("حقيبة", &[(black.clone(), dec!(49.99), 3)]).await;

    let meta = encoded_metadata(vec![line(product.id, 1, black)]);
    let body = event_body("checkout.session.completed", "paid", "pi_bad_sig", &meta);

    // Signature computed under the wrong secret
    let header = signature_header(&body, "whsec_wrong", chrono::Utc::now().timestamp());
    let (status, _) = app
        .request_raw(
            "POST",
            "/api/v1/payments/webhook",
            body.clone(),
            &[("stripe-signature", header.as_str())],
        )
        .await;
    assert_eq!(status, 401);

    // No signature at all
    let (status, _) = app
        .request_raw("POST", "/api/v1/payments/webhook", body, &[])
        .await;
    assert_eq!(status, 401);

    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 0);
    assert_eq!(variant_stock(&app, product.id).await, 3);
}

#[tokio::test]
async fn other_event_types_are_acknowledged_and_ignored() {
    let app = TestApp::new().await;
    let meta = encoded_metadata(vec![]);
    let body = event_body("charge.refunded", "paid", "pi_other", &meta);

    let (status, response) = post_signed(&app, &body).await;
    assert_eq!(status, 200);
    assert_eq!(response["received"], true);
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn unpaid_session_takes_no_action() {
    let app = TestApp::new().await;
    let white = props(&[("اللون", "أبيض")]);
    let product = app.seed_product("قبعة", &[(white.clone(), dec!(49.99), 2)]).await;

    let meta = encoded_metadata(vec![line(product.id, 1, white)]);
    let body = event_body("checkout.session.completed", "unpaid", "pi_unpaid", &meta);

    let (status, response) = post_signed(&app, &body).await;
    assert_eq!(status, 200);
    assert_eq!(response["received"], true);
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 0);
    assert_eq!(variant_stock(&app, product.id).await, 2);
}

#[tokio::test]
async fn oversell_clamps_stock_at_zero() {
    let app = TestApp::new().await;
    let green = props(&[("اللون", "أخضر")]);
    let product = app.seed_product("وشاح", &[(green.clone(), dec!(49.99), 1)]).await;

    // Two completed payments raced past verification for the last unit.
    for reference in ["pi_race_1", "pi_race_2"] {
        let meta = encoded_metadata(vec![line(product.id, 1, green.clone())]);
        let body = event_body("checkout.session.completed", "paid", reference, &meta);
        let (status, _) = post_signed(&app, &body).await;
        assert_eq!(status, 200);
    }

    // Both paid orders are recorded, and authoritative stock never goes
    // negative.
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 2);
    assert_eq!(variant_stock(&app, product.id).await, 0);
}

#[tokio::test]
async fn malformed_metadata_is_a_server_error_for_retry() {
    let app = TestApp::new().await;

    let mut meta = encoded_metadata(vec![]);
    meta.remove("order_0");
    let body = event_body("checkout.session.completed", "paid", "pi_broken", &meta);

    let (status, _) = post_signed(&app, &body).await;
    assert_eq!(status, 500);
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_variant_match_keeps_order_but_not_stock() {
    let app = TestApp::new().await;
    let red = props(&[("اللون", "أحمر")]);
    let product = app.seed_product("حذاء", &[(red, dec!(49.99), 5)]).await;

    // Purchased properties no longer match any variant (e.g. variant was
    // edited after checkout)
    let meta = encoded_metadata(vec![line(product.id, 1, props(&[("اللون", "ذهبي")]))]);
    let body = event_body("checkout.session.completed", "paid", "pi_nomatch", &meta);

    let (status, _) = post_signed(&app, &body).await;
    assert_eq!(status, 200);
    assert_eq!(Order::find().count(&*app.state.db).await.unwrap(), 1);
    assert_eq!(variant_stock(&app, product.id).await, 5);
}
