use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use souq_api::{
    config::AppConfig,
    entities::ProductModel,
    events::{self, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    payment::{
        CreateSessionRequest, GatewayError, HostedSession, PaymentGateway,
    },
    properties::PropertySet,
    AppState,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Payment gateway double: records every session request and returns a
/// canned hosted session.
#[derive(Default)]
pub struct MockGateway {
    pub requests: Mutex<Vec<CreateSessionRequest>>,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<HostedSession, GatewayError> {
        let mut requests = self.requests.lock().expect("gateway mutex poisoned");
        let id = format!("cs_test_{}", requests.len() + 1);
        requests.push(request);
        Ok(HostedSession {
            id,
            url: "https://pay.example/session".to_string(),
        })
    }
}

impl MockGateway {
    pub fn last_request(&self) -> CreateSessionRequest {
        self.requests
            .lock()
            .expect("gateway mutex poisoned")
            .last()
            .cloned()
            .expect("no session request recorded")
    }
}

/// Test harness: application state over an in-memory SQLite database with
/// the mock gateway wired in.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "https://store.example".to_string(),
            "sk_test_key".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.payment_webhook_secret = Some(WEBHOOK_SECRET.to_string());
        // A single pooled connection keeps the in-memory database alive
        // across queries.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let db = souq_api::db::establish_connection(&cfg)
            .await
            .expect("failed to open in-memory database");
        Migrator::up(&db, None)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(db);
        let config = Arc::new(cfg);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = Arc::new(MockGateway::default());
        let services = AppServices::new(
            db.clone(),
            config.clone(),
            Arc::new(event_sender.clone()),
            gateway.clone(),
        );

        let state = AppState {
            db,
            config,
            event_sender,
            services,
        };
        let router = souq_api::app_router(state.clone());

        Self {
            router,
            state,
            gateway,
            _event_task: event_task,
        }
    }

    /// Seeds a product with the given variants, returning the created
    /// model. Variants are (properties, price, stock) triples.
    pub async fn seed_product(
        &self,
        title: &str,
        variants: &[(PropertySet, Decimal, i32)],
    ) -> ProductModel {
        self.state
            .services
            .catalog
            .create_product(souq_api::services::catalog::CreateProductInput {
                title: title.to_string(),
                description: Some("وصف المنتج".to_string()),
                images: vec![format!("https://img.example/{}.jpg", title)],
                stock: None,
                variants: variants
                    .iter()
                    .map(
                        |(properties, price, stock)| souq_api::services::catalog::CreateVariantInput {
                            properties: properties.clone(),
                            price: *price,
                            cost: *price / Decimal::from(2),
                            stock: *stock,
                        },
                    )
                    .collect(),
            })
            .await
            .expect("failed to seed product")
    }

    /// Sends a raw-body request through the router; used by the webhook
    /// tests, where the signature covers the exact bytes sent.
    pub async fn request_raw(
        &self,
        method: &str,
        uri: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Sends a JSON request through the router and returns status + parsed
    /// body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("failed to build request"),
            None => builder.body(Body::empty()).expect("failed to build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

/// Builds a property-set from string pairs.
pub fn props(pairs: &[(&str, &str)]) -> PropertySet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Percent-encodes a path segment; request URIs must be ASCII even though
/// slugs are Arabic.
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::new();
    for byte in segment.as_bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
