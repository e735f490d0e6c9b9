use axum::{extract::State, http::HeaderMap, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    domain::webhook::{WebhookAck, WebhookServiceApi},
    error::AppResult,
    infrastructure::payments::WebhookSignature,
};

pub struct WebhookController {
    webhook_service: Arc<dyn WebhookServiceApi>,
}

impl WebhookController {
    pub fn new(webhook_service: Arc<dyn WebhookServiceApi>) -> Self {
        Self { webhook_service }
    }

    /// POST /api/webhooks/paypal - Provider notifications (public)
    pub async fn paypal(
        State(controller): State<Arc<WebhookController>>,
        headers: HeaderMap,
        Json(payload): Json<Value>,
    ) -> AppResult<Json<WebhookAck>> {
        let signature = signature_from_headers(&headers);
        let ack = controller.webhook_service.handle(&signature, payload).await?;
        Ok(Json(ack))
    }
}

fn signature_from_headers(headers: &HeaderMap) -> WebhookSignature {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    WebhookSignature {
        transmission_id: header("paypal-transmission-id"),
        transmission_time: header("paypal-transmission-time"),
        transmission_sig: header("paypal-transmission-sig"),
        cert_url: header("paypal-cert-url"),
        auth_algo: header("paypal-auth-algo"),
    }
}
