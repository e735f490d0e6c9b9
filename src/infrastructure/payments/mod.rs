pub mod paypal;

pub use paypal::PayPalClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Provider resource awaiting buyer approval
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    /// Provider id of the subscription or order
    pub external_id: String,
    /// Where the buyer approves the payment
    pub approval_url: String,
}

/// State of a provider subscription, reduced to what the lifecycle needs
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionCheck {
    Confirmed {
        plan_id: String,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    },
    Pending {
        status: String,
    },
    Failed {
        reason: String,
    },
}

/// Outcome of capturing a deposit order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderCapture {
    Confirmed { amount: Decimal },
    Pending { status: String },
    Failed { reason: String },
}

/// Transmission headers the provider signs webhooks with
#[derive(Debug, Clone, Default)]
pub struct WebhookSignature {
    pub transmission_id: String,
    pub transmission_time: String,
    pub transmission_sig: String,
    pub cert_url: String,
    pub auth_algo: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("authentication with payment provider failed: {0}")]
    Auth(String),
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),
}

/// Payment provider operations used by the billing services.
///
/// Implementations translate provider JSON into the tagged results above;
/// callers never see raw provider payloads.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a recurring subscription on `plan_id` for the user
    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan_id: &str,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Look up a subscription. An unknown id is `Failed`, not an error.
    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionCheck, PaymentError>;

    async fn cancel_subscription(&self, subscription_id: &str, reason: &str) -> Result<(), PaymentError>;

    /// Create a one-off order for a balance deposit
    async fn create_order(
        &self,
        user_id: Uuid,
        amount: Decimal,
        description: &str,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Capture an approved order. Already captured orders report `Confirmed`.
    async fn capture_order(&self, order_id: &str) -> Result<OrderCapture, PaymentError>;

    /// Check a webhook against the provider's signature verification
    async fn verify_webhook_signature(
        &self,
        webhook_id: &str,
        signature: &WebhookSignature,
        event: &serde_json::Value,
    ) -> Result<bool, PaymentError>;
}
