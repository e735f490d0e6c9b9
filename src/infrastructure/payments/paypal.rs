use super::{
    CheckoutSession, OrderCapture, PaymentError, PaymentGateway, SubscriptionCheck,
    WebhookSignature,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const BRAND_NAME: &str = "MegaPDF";
const TOKEN_CACHE_KEY: &str = "paypal_access_token";
/// Well under PayPal's token lifetime (hours), so a cached token never expires mid-request
const TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionDetails {
    status: String,
    plan_id: Option<String>,
    start_time: Option<DateTime<Utc>>,
    billing_info: Option<BillingInfo>,
    status_change_note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BillingInfo {
    last_payment: Option<LastPayment>,
    next_billing_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LastPayment {
    time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct OrderDetails {
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    amount: Money,
}

#[derive(Debug, Deserialize)]
struct Money {
    value: String,
}

#[derive(Debug, Deserialize)]
struct VerifySignatureResponse {
    verification_status: String,
}

/// PayPal REST client (subscriptions v1, orders v2)
pub struct PayPalClient {
    api_base: String,
    client_id: String,
    client_secret: String,
    app_url: String,
    http_client: reqwest::Client,
    token_cache: Cache<&'static str, String>,
}

impl PayPalClient {
    pub fn new(api_base: String, client_id: String, client_secret: String, app_url: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            app_url: app_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            token_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(TOKEN_TTL)
                .build(),
        }
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        self.token_cache
            .try_get_with(TOKEN_CACHE_KEY, self.fetch_access_token())
            .await
            .map_err(|e| PaymentError::Auth(e.to_string()))
    }

    async fn fetch_access_token(&self) -> Result<String, PaymentError> {
        tracing::debug!("Requesting PayPal access token");

        let response = self
            .http_client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Auth(format!("{}: {}", status, body)));
        }

        response
            .json::<AccessToken>()
            .await
            .map(|t| t.access_token)
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }

    fn approval_url(resource: &CreatedResource) -> Result<String, PaymentError> {
        resource
            .links
            .iter()
            .find(|l| l.rel == "approve")
            .map(|l| l.href.clone())
            .ok_or_else(|| {
                PaymentError::InvalidResponse("no approval URL in PayPal response".to_string())
            })
    }

    async fn api_error(response: reqwest::Response) -> PaymentError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(text);
        PaymentError::Api { status, message }
    }

    async fn get_order(&self, token: &str, order_id: &str) -> Result<OrderDetails, PaymentError> {
        let response = self
            .http_client
            .get(format!("{}/v2/checkout/orders/{}", self.api_base, order_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let token = self.access_token().await?;

        tracing::info!(user_id = %user_id, plan_id = %plan_id, "Creating PayPal subscription");

        let response = self
            .http_client
            .post(format!("{}/v1/billing/subscriptions", self.api_base))
            .bearer_auth(&token)
            .header("PayPal-Request-Id", format!("sub_{}_{}", user_id, Utc::now().timestamp_millis()))
            .json(&json!({
                "plan_id": plan_id,
                "custom_id": user_id.to_string(),
                "application_context": {
                    "brand_name": BRAND_NAME,
                    "locale": "en-US",
                    "shipping_preference": "NO_SHIPPING",
                    "user_action": "SUBSCRIBE_NOW",
                    "return_url": format!("{}/en/subscription/success", self.app_url),
                    "cancel_url": format!("{}/en/subscription/cancel", self.app_url),
                }
            }))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let created: CreatedResource = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        Ok(CheckoutSession {
            approval_url: Self::approval_url(&created)?,
            external_id: created.id,
        })
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<SubscriptionCheck, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(format!("{}/v1/billing/subscriptions/{}", self.api_base, subscription_id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(SubscriptionCheck::Failed {
                reason: "subscription not found".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let details: SubscriptionDetails = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        Ok(map_subscription(details))
    }

    async fn cancel_subscription(&self, subscription_id: &str, reason: &str) -> Result<(), PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(format!(
                "{}/v1/billing/subscriptions/{}/cancel",
                self.api_base, subscription_id
            ))
            .bearer_auth(&token)
            .json(&json!({ "reason": reason }))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(())
    }

    async fn create_order(
        &self,
        user_id: Uuid,
        amount: Decimal,
        description: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let token = self.access_token().await?;

        tracing::info!(user_id = %user_id, amount = %amount, "Creating PayPal order");

        let response = self
            .http_client
            .post(format!("{}/v2/checkout/orders", self.api_base))
            .bearer_auth(&token)
            .header("PayPal-Request-Id", format!("order_{}_{}", user_id, Utc::now().timestamp_millis()))
            .json(&json!({
                "intent": "CAPTURE",
                "purchase_units": [{
                    "reference_id": user_id.to_string(),
                    "description": description,
                    "amount": {
                        "currency_code": "USD",
                        "value": format_amount(amount),
                    }
                }],
                "application_context": {
                    "brand_name": BRAND_NAME,
                    "locale": "en-US",
                    "shipping_preference": "NO_SHIPPING",
                    "user_action": "PAY_NOW",
                    "return_url": format!("{}/en/dashboard/success", self.app_url),
                    "cancel_url": format!("{}/en/dashboard/cancel", self.app_url),
                }
            }))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let created: CreatedResource = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        Ok(CheckoutSession {
            approval_url: Self::approval_url(&created)?,
            external_id: created.id,
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<OrderCapture, PaymentError> {
        let token = self.access_token().await?;
        let order = self.get_order(&token, order_id).await?;

        match order.status.as_str() {
            "COMPLETED" => return map_order(order),
            "APPROVED" => {}
            "VOIDED" => {
                return Ok(OrderCapture::Failed {
                    reason: "order was voided".to_string(),
                })
            }
            _ => return map_order(order),
        }

        let response = self
            .http_client
            .post(format!("{}/v2/checkout/orders/{}/capture", self.api_base, order_id))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        // 422 is ORDER_ALREADY_CAPTURED from a concurrent capture, or a
        // declined instrument. The order itself says which.
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let err = Self::api_error(response).await;
            let order = self.get_order(&token, order_id).await?;
            tracing::info!(order_id = %order_id, status = %order.status, error = %err, "Capture rejected, re-read order");
            return map_rejected_capture(order);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let captured: OrderDetails = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        map_order(captured)
    }

    async fn verify_webhook_signature(
        &self,
        webhook_id: &str,
        signature: &WebhookSignature,
        event: &serde_json::Value,
    ) -> Result<bool, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(format!("{}/v1/notifications/verify-webhook-signature", self.api_base))
            .bearer_auth(&token)
            .json(&json!({
                "auth_algo": signature.auth_algo,
                "cert_url": signature.cert_url,
                "transmission_id": signature.transmission_id,
                "transmission_sig": signature.transmission_sig,
                "transmission_time": signature.transmission_time,
                "webhook_id": webhook_id,
                "webhook_event": event,
            }))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let result: VerifySignatureResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        Ok(result.verification_status == "SUCCESS")
    }
}

fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn map_subscription(details: SubscriptionDetails) -> SubscriptionCheck {
    match details.status.as_str() {
        "ACTIVE" | "APPROVED" => {
            let Some(plan_id) = details.plan_id else {
                return SubscriptionCheck::Failed {
                    reason: "subscription has no plan".to_string(),
                };
            };
            let billing_info = details.billing_info;
            let period_start = billing_info
                .as_ref()
                .and_then(|b| b.last_payment.as_ref())
                .and_then(|p| p.time)
                .or(details.start_time);
            let period_end = billing_info.and_then(|b| b.next_billing_time);

            SubscriptionCheck::Confirmed {
                plan_id,
                period_start,
                period_end,
            }
        }
        "APPROVAL_PENDING" => SubscriptionCheck::Pending {
            status: details.status,
        },
        other => SubscriptionCheck::Failed {
            reason: details
                .status_change_note
                .unwrap_or_else(|| format!("subscription is {}", other.to_lowercase())),
        },
    }
}

fn map_order(order: OrderDetails) -> Result<OrderCapture, PaymentError> {
    match order.status.as_str() {
        "COMPLETED" => {
            let value = order
                .purchase_units
                .first()
                .and_then(|u| u.payments.as_ref())
                .and_then(|p| p.captures.first())
                .map(|c| c.amount.value.clone())
                .ok_or_else(|| {
                    PaymentError::InvalidResponse("completed order without capture".to_string())
                })?;
            let amount = Decimal::from_str(&value)
                .map_err(|e| PaymentError::InvalidResponse(format!("bad amount {}: {}", value, e)))?;
            Ok(OrderCapture::Confirmed { amount })
        }
        "CREATED" | "SAVED" | "APPROVED" | "PAYER_ACTION_REQUIRED" => Ok(OrderCapture::Pending {
            status: order.status,
        }),
        other => Ok(OrderCapture::Failed {
            reason: format!("order is {}", other.to_lowercase()),
        }),
    }
}

/// Outcome of an order whose capture call was refused. Only a terminal
/// order state fails the deposit; an order still awaiting the buyer stays
/// pending so a later capture or webhook can settle it.
fn map_rejected_capture(order: OrderDetails) -> Result<OrderCapture, PaymentError> {
    match order.status.as_str() {
        "COMPLETED" | "VOIDED" => map_order(order),
        "CREATED" | "SAVED" | "APPROVED" | "PAYER_ACTION_REQUIRED" => Ok(OrderCapture::Pending {
            status: order.status,
        }),
        other => Ok(OrderCapture::Failed {
            reason: format!("order is {}", other.to_lowercase()),
        }),
    }
}
