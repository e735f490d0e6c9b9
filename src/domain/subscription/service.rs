use super::dto::SubscriptionResponse;
use super::error::SubscriptionServiceError;
use super::model::{Subscription, SubscriptionTier};
use super::state;
use crate::infrastructure::config::PlanIds;
use crate::infrastructure::payments::{PaymentGateway, SubscriptionCheck};
use crate::infrastructure::repositories::SubscriptionRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

const CANCEL_REASON: &str = "Canceled by user";

pub struct SubscriptionService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    plans: PlanIds,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        plans: PlanIds,
    ) -> Self {
        Self {
            subscription_repo,
            gateway,
            plans,
        }
    }
}

#[async_trait]
pub trait SubscriptionServiceApi: Send + Sync {
    async fn get_subscription(&self, user_id: Uuid) -> Result<SubscriptionResponse, SubscriptionServiceError>;

    /// Start a checkout for a paid tier, or switch to free directly
    async fn create_subscription(
        &self,
        user_id: Uuid,
        tier: &str,
    ) -> Result<SubscriptionResponse, SubscriptionServiceError>;

    /// Start a checkout for a paid tier
    async fn upgrade(&self, user_id: Uuid, tier: &str) -> Result<SubscriptionResponse, SubscriptionServiceError>;

    /// Reconcile the user's row with the provider after checkout returns
    async fn verify(
        &self,
        user_id: Uuid,
        subscription_id: Option<&str>,
    ) -> Result<SubscriptionResponse, SubscriptionServiceError>;

    async fn cancel(&self, user_id: Uuid) -> Result<SubscriptionResponse, SubscriptionServiceError>;

    async fn reset_pending(&self, user_id: Uuid) -> Result<SubscriptionResponse, SubscriptionServiceError>;

    /// Apply provider-reported state to the row holding `paypal_subscription_id`.
    /// Returns false when no local row references it.
    async fn apply_provider_state(
        &self,
        paypal_subscription_id: &str,
        check: SubscriptionCheck,
    ) -> Result<bool, SubscriptionServiceError>;
}

#[async_trait]
impl SubscriptionServiceApi for SubscriptionService {
    async fn get_subscription(&self, user_id: Uuid) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let sub = self.load(user_id).await?;
        Ok(SubscriptionResponse::ok(&sub))
    }

    async fn create_subscription(
        &self,
        user_id: Uuid,
        tier: &str,
    ) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let tier = parse_tier(tier, true)?;
        self.change_plan(user_id, tier).await
    }

    async fn upgrade(&self, user_id: Uuid, tier: &str) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let tier = parse_tier(tier, false)?;
        self.change_plan(user_id, tier).await
    }

    async fn verify(
        &self,
        user_id: Uuid,
        subscription_id: Option<&str>,
    ) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let sub = self.load(user_id).await?;
        let now = Utc::now();

        let Some(subscription_id) = subscription_id.filter(|s| !s.is_empty()) else {
            if sub.is_pending() {
                let settled = self.save(&state::settle_to_free(&sub, now)).await?;
                tracing::info!(user_id = %user_id, "Pending checkout settled to free without confirmation");
                return Ok(SubscriptionResponse::with_message(
                    &settled,
                    false,
                    "Payment not completed or was canceled",
                ));
            }
            return Ok(SubscriptionResponse::with_message(
                &sub,
                false,
                "No pending subscription found",
            ));
        };

        if sub.paypal_subscription_id.as_deref() != Some(subscription_id) {
            return Err(SubscriptionServiceError::Invalid(
                "Subscription ID does not match your subscription".to_string(),
            ));
        }

        let check = self.gateway.get_subscription(subscription_id).await?;

        match check {
            SubscriptionCheck::Confirmed { .. } => {
                let confirmed = self.apply(&sub, subscription_id, check).await?;
                Ok(SubscriptionResponse::with_message(
                    &confirmed,
                    true,
                    "Subscription activated",
                ))
            }
            SubscriptionCheck::Pending { status } => {
                tracing::info!(user_id = %user_id, subscription_id = %subscription_id, status = %status, "Subscription still awaiting approval");
                Ok(SubscriptionResponse::with_message(
                    &sub,
                    false,
                    "Payment not completed yet",
                ))
            }
            SubscriptionCheck::Failed { ref reason } => {
                tracing::info!(user_id = %user_id, subscription_id = %subscription_id, reason = %reason, "Subscription not confirmed by provider");
                let current = if sub.is_pending() {
                    self.save(&state::settle_to_free(&sub, now)).await?
                } else {
                    sub
                };
                Ok(SubscriptionResponse::with_message(
                    &current,
                    false,
                    "Subscription not found or was canceled",
                ))
            }
        }
    }

    async fn cancel(&self, user_id: Uuid) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let sub = self.load(user_id).await?;
        state::guard_cancel(&sub)?;

        let message = match sub.paypal_subscription_id.as_deref() {
            None => "Subscription cancelled successfully.",
            Some(external_id) => match self.gateway.cancel_subscription(external_id, CANCEL_REASON).await {
                Ok(()) => "Subscription cancelled successfully",
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        subscription_id = %external_id,
                        error = %e,
                        "Provider cancellation failed, canceling locally"
                    );
                    "Subscription cancelled in our system. There may have been an issue with PayPal, but your account has been updated."
                }
            },
        };

        let canceled = self.save(&state::cancel(&sub, Utc::now())).await?;
        tracing::info!(user_id = %user_id, previous_tier = %sub.tier, "Subscription canceled");

        Ok(SubscriptionResponse::with_message(&canceled, true, message))
    }

    async fn reset_pending(&self, user_id: Uuid) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let sub = self.load(user_id).await?;
        if !sub.is_pending() {
            return Ok(SubscriptionResponse::with_message(
                &sub,
                true,
                "No pending subscription to reset",
            ));
        }

        let settled = self.save(&state::settle_to_free(&sub, Utc::now())).await?;
        tracing::info!(
            user_id = %user_id,
            subscription_id = ?sub.paypal_subscription_id,
            "Pending subscription reset"
        );

        Ok(SubscriptionResponse::with_message(
            &settled,
            true,
            "Pending subscription has been reset",
        ))
    }

    async fn apply_provider_state(
        &self,
        paypal_subscription_id: &str,
        check: SubscriptionCheck,
    ) -> Result<bool, SubscriptionServiceError> {
        let sub = self
            .subscription_repo
            .find_by_paypal_id(paypal_subscription_id)
            .await
            .map_err(|e| SubscriptionServiceError::Dependency(e.to_string()))?;

        let Some(sub) = sub else {
            tracing::warn!(subscription_id = %paypal_subscription_id, "No local subscription for provider id");
            return Ok(false);
        };

        self.apply(&sub, paypal_subscription_id, check).await?;
        Ok(true)
    }
}

impl SubscriptionService {
    async fn load(&self, user_id: Uuid) -> Result<Subscription, SubscriptionServiceError> {
        self.subscription_repo
            .get_or_create(user_id, Utc::now())
            .await
            .map_err(|e| SubscriptionServiceError::Dependency(e.to_string()))
    }

    async fn save(&self, sub: &Subscription) -> Result<Subscription, SubscriptionServiceError> {
        self.subscription_repo
            .save(sub)
            .await
            .map_err(|e| SubscriptionServiceError::Dependency(e.to_string()))
    }

    async fn change_plan(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<SubscriptionResponse, SubscriptionServiceError> {
        let sub = self.load(user_id).await?;
        let now = Utc::now();

        if tier == SubscriptionTier::Free {
            state::guard_downgrade_to_free(&sub)?;
            let settled = self.save(&state::settle_to_free(&sub, now)).await?;
            tracing::info!(user_id = %user_id, "Subscription downgraded to free tier");
            return Ok(SubscriptionResponse::with_message(
                &settled,
                true,
                "Subscription downgraded to free tier",
            ));
        }

        state::guard_checkout(&sub)?;
        let plan_id = self.plan_for(tier)?;

        // Local state is only written once the provider accepted the checkout
        let session = self.gateway.create_subscription(user_id, plan_id).await?;
        let pending = self
            .save(&state::begin_checkout(&sub, &session.external_id, now))
            .await?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %session.external_id,
            target_tier = %tier,
            "Subscription checkout started"
        );

        Ok(SubscriptionResponse {
            checkout_url: Some(session.approval_url),
            subscription_id: Some(session.external_id),
            ..SubscriptionResponse::with_message(
                &pending,
                true,
                "Please complete the payment process on PayPal",
            )
        })
    }

    async fn apply(
        &self,
        sub: &Subscription,
        external_id: &str,
        check: SubscriptionCheck,
    ) -> Result<Subscription, SubscriptionServiceError> {
        let now = Utc::now();
        match check {
            SubscriptionCheck::Confirmed {
                plan_id,
                period_start,
                period_end,
            } => {
                let tier = self.tier_for_plan(&plan_id);
                let confirmed = self
                    .save(&state::confirm(sub, tier, external_id, &plan_id, period_start, period_end, now))
                    .await?;
                tracing::info!(
                    user_id = %sub.user_id,
                    subscription_id = %external_id,
                    tier = %tier,
                    "Subscription confirmed"
                );
                Ok(confirmed)
            }
            SubscriptionCheck::Failed { reason } => {
                let settled = self.save(&state::settle_to_free(sub, now)).await?;
                tracing::info!(
                    user_id = %sub.user_id,
                    subscription_id = %external_id,
                    reason = %reason,
                    "Subscription settled to free"
                );
                Ok(settled)
            }
            SubscriptionCheck::Pending { .. } => Ok(sub.clone()),
        }
    }

    fn plan_for(&self, tier: SubscriptionTier) -> Result<&str, SubscriptionServiceError> {
        let plan_id = match tier {
            SubscriptionTier::Basic => &self.plans.basic,
            SubscriptionTier::Pro => &self.plans.pro,
            SubscriptionTier::Enterprise => &self.plans.enterprise,
            SubscriptionTier::Free => {
                return Err(SubscriptionServiceError::Invalid(
                    "Invalid subscription tier".to_string(),
                ))
            }
        };

        if plan_id.is_empty() {
            return Err(SubscriptionServiceError::Dependency(format!(
                "no provider plan configured for tier {}",
                tier
            )));
        }
        Ok(plan_id)
    }

    fn tier_for_plan(&self, plan_id: &str) -> SubscriptionTier {
        if plan_id == self.plans.pro {
            SubscriptionTier::Pro
        } else if plan_id == self.plans.enterprise {
            SubscriptionTier::Enterprise
        } else {
            if plan_id != self.plans.basic {
                tracing::warn!(plan_id = %plan_id, "Unknown provider plan, assuming basic tier");
            }
            SubscriptionTier::Basic
        }
    }
}

fn parse_tier(raw: &str, allow_free: bool) -> Result<SubscriptionTier, SubscriptionServiceError> {
    match raw.parse::<SubscriptionTier>() {
        Ok(SubscriptionTier::Free) if !allow_free => Err(SubscriptionServiceError::Invalid(
            "Invalid subscription tier".to_string(),
        )),
        Ok(tier) => Ok(tier),
        Err(_) => Err(SubscriptionServiceError::Invalid(
            "Invalid subscription tier".to_string(),
        )),
    }
}
