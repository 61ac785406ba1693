//! Payment-provider integration: hosted checkout session creation, the
//! versioned order-metadata codec carried on the session, and signed
//! completion-webhook handling.

pub mod gateway;
pub mod metadata;
pub mod webhook;

pub use gateway::{
    CreateSessionRequest, GatewayError, HostedCheckoutGateway, HostedSession, PaymentGateway,
    SessionLineItem,
};
pub use metadata::{CustomerDetails, MetadataError, MetadataLine, OrderMetadata};
pub use webhook::{
    signature_header, verify_signature, CheckoutSessionObject, WebhookEvent,
    CHECKOUT_SESSION_COMPLETED, PAYMENT_STATUS_PAID,
};
