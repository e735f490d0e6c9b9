use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of a provider webhook notification
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource: Value,
}

impl WebhookEvent {
    pub fn resource_id(&self) -> Option<&str> {
        self.resource.get("id").and_then(Value::as_str)
    }

    /// Order a capture event belongs to. Captures carry the order id under
    /// `supplementary_data`; older payloads only have the resource id.
    pub fn order_id(&self) -> Option<&str> {
        self.resource
            .pointer("/supplementary_data/related_ids/order_id")
            .and_then(Value::as_str)
            .or_else(|| self.resource_id())
    }

    pub fn plan_id(&self) -> Option<&str> {
        self.resource.get("plan_id").and_then(Value::as_str)
    }

    /// Start of the paid period: last payment time, else subscription start
    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        self.timestamp("/billing_info/last_payment/time")
            .or_else(|| self.timestamp("/start_time"))
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.timestamp("/billing_info/next_billing_time")
    }

    fn timestamp(&self, pointer: &str) -> Option<DateTime<Utc>> {
        self.resource
            .pointer(pointer)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub event_id: String,
    pub event_type: String,
    /// False for duplicates and event types nothing listens to
    pub processed: bool,
    pub message: String,
}
