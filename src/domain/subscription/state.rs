//! Pure transitions of the subscription lifecycle.
//!
//! `free/active` → `pending` (checkout started, tier retained) →
//! `active/<tier>` on confirmation, or back to `free/active` when the
//! checkout fails or is abandoned. Cancellation always settles to
//! `free/active` with no external id attached.

use super::model::{Subscription, SubscriptionStatus, SubscriptionTier};
use chrono::{DateTime, Duration, Utc};

/// Billing period assumed when the provider reports no next billing time
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("A checkout is already pending. Complete it or reset it before starting another")]
    CheckoutPending,
    #[error("Please cancel your existing subscription from the dashboard first")]
    ExternalSubscriptionAttached,
    #[error("No active subscription to cancel")]
    NothingToCancel,
}

/// Paid and live at the provider. Expired or settled rows never count,
/// whatever ids they still carry.
fn paid_subscription_attached(sub: &Subscription) -> bool {
    sub.status == SubscriptionStatus::Active && sub.tier.is_paid() && sub.has_external_subscription()
}

/// Reject a new checkout while another is in flight or a paid external
/// subscription is still attached.
pub fn guard_checkout(sub: &Subscription) -> Result<(), TransitionError> {
    if sub.is_pending() {
        return Err(TransitionError::CheckoutPending);
    }
    if paid_subscription_attached(sub) {
        return Err(TransitionError::ExternalSubscriptionAttached);
    }
    Ok(())
}

/// Direct switch to free, only allowed with no paid subscription live at
/// the provider
pub fn guard_downgrade_to_free(sub: &Subscription) -> Result<(), TransitionError> {
    if paid_subscription_attached(sub) {
        return Err(TransitionError::ExternalSubscriptionAttached);
    }
    Ok(())
}

pub fn guard_cancel(sub: &Subscription) -> Result<(), TransitionError> {
    if !sub.tier.is_paid() && !sub.has_external_subscription() {
        return Err(TransitionError::NothingToCancel);
    }
    Ok(())
}

/// Checkout created at the provider: remember its id, keep the current tier.
pub fn begin_checkout(sub: &Subscription, external_id: &str, now: DateTime<Utc>) -> Subscription {
    Subscription {
        status: SubscriptionStatus::Pending,
        paypal_subscription_id: Some(external_id.to_string()),
        updated_at: now,
        ..sub.clone()
    }
}

/// Provider confirmed payment: the target tier becomes authoritative.
pub fn confirm(
    sub: &Subscription,
    tier: SubscriptionTier,
    external_id: &str,
    plan_id: &str,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Subscription {
    let start = period_start.unwrap_or(now);
    let end = period_end.unwrap_or(start + Duration::days(DEFAULT_PERIOD_DAYS));

    Subscription {
        tier,
        status: SubscriptionStatus::Active,
        paypal_subscription_id: Some(external_id.to_string()),
        paypal_plan_id: Some(plan_id.to_string()),
        current_period_start: Some(start),
        current_period_end: Some(end),
        canceled_at: None,
        updated_at: now,
        ..sub.clone()
    }
}

/// Back to `free/active` with nothing attached at the provider.
pub fn settle_to_free(sub: &Subscription, now: DateTime<Utc>) -> Subscription {
    Subscription {
        tier: SubscriptionTier::Free,
        status: SubscriptionStatus::Active,
        paypal_subscription_id: None,
        paypal_plan_id: None,
        current_period_start: None,
        current_period_end: None,
        updated_at: now,
        ..sub.clone()
    }
}

/// User-initiated cancel. Local state wins regardless of the provider.
pub fn cancel(sub: &Subscription, now: DateTime<Utc>) -> Subscription {
    Subscription {
        canceled_at: Some(now),
        ..settle_to_free(sub, now)
    }
}

/// Period lapsed without renewal. The provider subscription is over, so
/// nothing stays attached.
pub fn expire(sub: &Subscription, now: DateTime<Utc>) -> Subscription {
    Subscription {
        tier: SubscriptionTier::Free,
        status: SubscriptionStatus::Expired,
        paypal_subscription_id: None,
        paypal_plan_id: None,
        updated_at: now,
        ..sub.clone()
    }
}

/// Whether the periodic sweep should expire this row at `now`
pub fn is_expirable(sub: &Subscription, now: DateTime<Utc>) -> bool {
    sub.status == SubscriptionStatus::Active
        && sub.tier.is_paid()
        && sub.current_period_end.map_or(false, |end| end < now)
}

/// Pending checkout abandoned for longer than `ttl`
pub fn is_stale_checkout(sub: &Subscription, ttl: Duration, now: DateTime<Utc>) -> bool {
    sub.is_pending() && sub.updated_at + ttl < now
}

/// Whether a renewal reminder is due within `window` and not yet sent for
/// the current period
pub fn needs_reminder(sub: &Subscription, window: Duration, now: DateTime<Utc>) -> bool {
    let Some(end) = sub.current_period_end else {
        return false;
    };
    if sub.status != SubscriptionStatus::Active || !sub.tier.is_paid() {
        return false;
    }
    if end < now || end > now + window {
        return false;
    }
    let period_start = sub.current_period_start.unwrap_or(sub.created_at);
    sub.reminder_sent_at.map_or(true, |sent| sent < period_start)
}
