mod common;

use common::{encode_segment, props, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_product_assigns_slug_and_numeric_suffix_on_collision() {
    let app = TestApp::new().await;

    let first = app
        .seed_product("قميص صيفي", &[(props(&[("اللون", "أحمر")]), dec!(49.99), 5)])
        .await;
    let second = app
        .seed_product("قميص صيفي", &[(props(&[("اللون", "أزرق")]), dec!(49.99), 5)])
        .await;
    let third = app
        .seed_product("قميص صيفي", &[(props(&[("اللون", "أسود")]), dec!(49.99), 5)])
        .await;

    assert_eq!(first.slug, "قميص-صيفي");
    assert_eq!(second.slug, "قميص-صيفي-1");
    assert_eq!(third.slug, "قميص-صيفي-2");
}

#[tokio::test]
async fn get_product_by_slug_returns_variants_and_ratings() {
    let app = TestApp::new().await;
    let product = app
        .seed_product(
            "حذاء رياضي",
            &[
                (props(&[("المقاس", "41")]), dec!(120), 3),
                (props(&[("المقاس", "42")]), dec!(120), 0),
            ],
        )
        .await;

    let (status, body) = app
        .request(
            "GET",
            &format!("/api/v1/products/{}", encode_segment(&product.slug)),
            None,
            &[],
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["title"], "حذاء رياضي");
    assert_eq!(body["variants"].as_array().unwrap().len(), 2);
    assert_eq!(body["ratings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_slug_is_404() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            "GET",
            &format!("/api/v1/products/{}", encode_segment("غير-موجود")),
            None,
            &[],
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "المنتج غير موجود");
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let app = TestApp::new().await;
    for i in 0..3 {
        app.seed_product(&format!("منتج {}", i), &[(props(&[]), dec!(10), 1)])
            .await;
    }

    let (status, body) = app
        .request("GET", "/api/v1/products?page=1&per_page=2", None, &[])
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn enrich_groups_entries_and_joins_display_data() {
    let app = TestApp::new().await;
    let product = app
        .seed_product("قميص", &[(props(&[("اللون", "أحمر")]), dec!(49.99), 5)])
        .await;
    let variant_id = Uuid::new_v4();

    let unit = json!({
        "product_id": product.id,
        "variant_id": variant_id,
        "properties": {"اللون": "أحمر"},
        "unit_price": "49.99",
        "stock_snapshot": 5
    });
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/cart/enrich",
            Some(json!({ "items": [unit.clone(), unit.clone(), unit] })),
            &[],
        )
        .await;

    assert_eq!(status, 200);
    let lines = body.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["title"], "قميص");
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["image"], "https://img.example/قميص.jpg");
}

#[tokio::test]
async fn enrich_drops_vanished_products() {
    let app = TestApp::new().await;

    let unit = json!({
        "product_id": Uuid::new_v4(),
        "variant_id": Uuid::new_v4(),
        "properties": {},
        "unit_price": "10",
        "stock_snapshot": 1
    });
    let (status, body) = app
        .request(
            "POST",
            "/api/v1/cart/enrich",
            Some(json!({ "items": [unit] })),
            &[],
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 0);
}
