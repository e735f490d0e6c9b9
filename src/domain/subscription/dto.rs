use super::model::{Subscription, SubscriptionStatus, SubscriptionTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of POST /api/subscription and /api/subscription/upgrade
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub tier: String,
}

/// Query of GET /api/subscription/verify
#[derive(Debug, Default, Deserialize)]
pub struct VerifySubscriptionQuery {
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub tier: SubscriptionTier,
    /// Tier that currently gates access
    pub effective_tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub usage_reset_date: DateTime<Utc>,
}

impl From<&Subscription> for SubscriptionView {
    fn from(sub: &Subscription) -> Self {
        Self {
            tier: sub.tier,
            effective_tier: sub.effective_tier(),
            status: sub.status,
            paypal_subscription_id: sub.paypal_subscription_id.clone(),
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            canceled_at: sub.canceled_at,
            usage_reset_date: sub.usage_reset_date,
        }
    }
}

/// Envelope for every subscription endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Provider approval page, present when a checkout was started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub subscription: SubscriptionView,
}

impl SubscriptionResponse {
    pub fn ok(sub: &Subscription) -> Self {
        Self {
            success: true,
            message: None,
            checkout_url: None,
            subscription_id: None,
            subscription: sub.into(),
        }
    }

    pub fn with_message(sub: &Subscription, success: bool, message: &str) -> Self {
        Self {
            success,
            message: Some(message.to_string()),
            ..Self::ok(sub)
        }
    }
}
