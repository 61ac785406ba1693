use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::instrument;

/// One line item on the hosted checkout page. Amounts are in minor
/// currency units (fils), as the provider requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Request for a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// A created hosted session: the provider's id plus the redirect URL the
/// customer is sent to.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment provider error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<GatewayError> for crate::errors::ServiceError {
    fn from(err: GatewayError) -> Self {
        crate::errors::ServiceError::ExternalServiceError(err.to_string())
    }
}

/// Payment provider boundary. The application is stateless towards the
/// provider between session creation and the completion notification.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<HostedSession, GatewayError>;
}

/// Stripe-compatible hosted checkout client.
pub struct HostedCheckoutGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl HostedCheckoutGateway {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            api_base,
        }
    }

    /// The provider's form encoding addresses nested fields with bracketed
    /// paths, e.g. `line_items[0][price_data][unit_amount]`.
    fn form_params(request: &CreateSessionRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "customer_email".to_string(),
                request.customer_email.clone(),
            ),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            params.push((
                format!("line_items[{}][quantity]", i),
                item.quantity.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][currency]", i),
                item.currency.to_lowercase(),
            ));
            params.push((
                format!("line_items[{}][price_data][unit_amount]", i),
                item.unit_amount.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][product_data][name]", i),
                item.name.clone(),
            ));
            if let Some(description) = &item.description {
                if !description.is_empty() {
                    params.push((
                        format!("line_items[{}][price_data][product_data][description]", i),
                        description.clone(),
                    ));
                }
            }
        }

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        params
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<HostedSession, GatewayError> {
        let params = Self::form_params(&request);
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<HostedSession>().await?)
    }
}
