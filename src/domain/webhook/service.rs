use super::dto::{WebhookAck, WebhookEvent};
use super::error::WebhookServiceError;
use crate::domain::billing::BillingServiceApi;
use crate::domain::subscription::SubscriptionServiceApi;
use crate::infrastructure::payments::{PaymentGateway, SubscriptionCheck, WebhookSignature};
use crate::infrastructure::repositories::{NewWebhookEvent, WebhookEventRepository};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub struct WebhookService {
    event_repo: Arc<dyn WebhookEventRepository>,
    billing_service: Arc<dyn BillingServiceApi>,
    subscription_service: Arc<dyn SubscriptionServiceApi>,
    gateway: Arc<dyn PaymentGateway>,
    webhook_id: Option<String>,
}

impl WebhookService {
    pub fn new(
        event_repo: Arc<dyn WebhookEventRepository>,
        billing_service: Arc<dyn BillingServiceApi>,
        subscription_service: Arc<dyn SubscriptionServiceApi>,
        gateway: Arc<dyn PaymentGateway>,
        webhook_id: Option<String>,
    ) -> Self {
        Self {
            event_repo,
            billing_service,
            subscription_service,
            gateway,
            webhook_id,
        }
    }
}

#[async_trait]
pub trait WebhookServiceApi: Send + Sync {
    /// Verify, deduplicate and apply one provider notification
    async fn handle(
        &self,
        signature: &WebhookSignature,
        payload: Value,
    ) -> Result<WebhookAck, WebhookServiceError>;
}

#[async_trait]
impl WebhookServiceApi for WebhookService {
    async fn handle(
        &self,
        signature: &WebhookSignature,
        payload: Value,
    ) -> Result<WebhookAck, WebhookServiceError> {
        self.verify_signature(signature, &payload).await?;

        let event: WebhookEvent = serde_json::from_value(payload.clone())
            .map_err(|_| WebhookServiceError::Invalid("Invalid webhook payload".to_string()))?;

        let recorded = self
            .event_repo
            .is_recorded(&event.id)
            .await
            .map_err(|e| WebhookServiceError::Dependency(e.to_string()))?;
        if recorded {
            tracing::info!(event_id = %event.id, event_type = %event.event_type, "Duplicate webhook ignored");
            return Ok(ack(&event, false, "Event already processed"));
        }

        let processed = self.dispatch(&event).await?;

        let stored = NewWebhookEvent {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            resource_type: event.resource_type.clone(),
            resource_id: event.resource_id().map(str::to_string),
            raw_data: payload,
        };
        self.event_repo
            .insert_if_new(&stored, Utc::now())
            .await
            .map_err(|e| WebhookServiceError::Dependency(e.to_string()))?;

        let message = if processed { "Event processed" } else { "Event ignored" };
        Ok(ack(&event, processed, message))
    }
}

impl WebhookService {
    async fn verify_signature(
        &self,
        signature: &WebhookSignature,
        payload: &Value,
    ) -> Result<(), WebhookServiceError> {
        let Some(webhook_id) = &self.webhook_id else {
            return Ok(());
        };

        let valid = self
            .gateway
            .verify_webhook_signature(webhook_id, signature, payload)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Webhook signature check failed at provider");
                WebhookServiceError::Provider(e.to_string())
            })?;

        if !valid {
            tracing::warn!(transmission_id = %signature.transmission_id, "Webhook signature rejected");
            return Err(WebhookServiceError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns false for event types with no local effect
    async fn dispatch(&self, event: &WebhookEvent) -> Result<bool, WebhookServiceError> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Processing webhook");

        match event.event_type.as_str() {
            "PAYMENT.CAPTURE.COMPLETED" => {
                let order_id = required(event.order_id(), "order id")?;
                let credited = self
                    .billing_service
                    .complete_deposit_from_provider(order_id)
                    .await
                    .map_err(|e| WebhookServiceError::Dependency(e.to_string()))?;
                if !credited {
                    tracing::debug!(order_id = %order_id, "Capture had no open deposit");
                }
                Ok(true)
            }
            "PAYMENT.CAPTURE.DENIED" => {
                let order_id = required(event.order_id(), "order id")?;
                self.billing_service
                    .fail_deposit_from_provider(order_id)
                    .await
                    .map_err(|e| WebhookServiceError::Dependency(e.to_string()))?;
                Ok(true)
            }
            "BILLING.SUBSCRIPTION.ACTIVATED" => {
                let subscription_id = required(event.resource_id(), "subscription id")?;
                let plan_id = required(event.plan_id(), "plan id")?;
                let check = SubscriptionCheck::Confirmed {
                    plan_id: plan_id.to_string(),
                    period_start: event.period_start(),
                    period_end: event.period_end(),
                };
                self.apply_subscription(subscription_id, check).await
            }
            "BILLING.SUBSCRIPTION.CANCELLED"
            | "BILLING.SUBSCRIPTION.EXPIRED"
            | "BILLING.SUBSCRIPTION.SUSPENDED" => {
                let subscription_id = required(event.resource_id(), "subscription id")?;
                let check = SubscriptionCheck::Failed {
                    reason: event.event_type.clone(),
                };
                self.apply_subscription(subscription_id, check).await
            }
            other => {
                tracing::debug!(event_type = %other, "Unhandled webhook event type");
                Ok(false)
            }
        }
    }

    async fn apply_subscription(
        &self,
        subscription_id: &str,
        check: SubscriptionCheck,
    ) -> Result<bool, WebhookServiceError> {
        self.subscription_service
            .apply_provider_state(subscription_id, check)
            .await
            .map_err(|e| WebhookServiceError::Dependency(e.to_string()))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, WebhookServiceError> {
    value.ok_or_else(|| WebhookServiceError::Invalid(format!("Webhook resource is missing {}", field)))
}

fn ack(event: &WebhookEvent, processed: bool, message: &str) -> WebhookAck {
    WebhookAck {
        success: true,
        event_id: event.id.clone(),
        event_type: event.event_type.clone(),
        processed,
        message: message.to_string(),
    }
}
