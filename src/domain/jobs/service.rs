use super::dto::{ExpireReport, JobKind, JobReport, RemindReport, ResetUsageReport};
use super::error::JobsServiceError;
use crate::domain::billing::quota::{advance_monthly, first_day_of_next_month};
use crate::domain::subscription::{state, Subscription};
use crate::domain::user::User;
use crate::infrastructure::email::{templates, EmailSender};
use crate::infrastructure::repositories::{SubscriptionRepository, UsageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// How far ahead of period end renewal reminders go out
pub const REMINDER_WINDOW_DAYS: i64 = 3;

pub struct JobsService {
    user_repo: Arc<dyn UserRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    usage_repo: Arc<dyn UsageRepository>,
    email: Arc<dyn EmailSender>,
    app_url: String,
    pending_checkout_ttl: Duration,
}

impl JobsService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        usage_repo: Arc<dyn UsageRepository>,
        email: Arc<dyn EmailSender>,
        app_url: String,
        pending_checkout_ttl_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
            usage_repo,
            email,
            app_url,
            pending_checkout_ttl: Duration::hours(pending_checkout_ttl_hours),
        }
    }
}

/// Periodic billing sweeps. Every job is idempotent: a second run at the
/// same instant changes nothing.
#[async_trait]
pub trait JobsServiceApi: Send + Sync {
    async fn run(&self, job: JobKind, now: DateTime<Utc>) -> Result<JobReport, JobsServiceError>;

    /// Downgrade lapsed paid subscriptions and settle abandoned checkouts
    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<ExpireReport, JobsServiceError>;

    async fn send_expiry_reminders(&self, now: DateTime<Utc>) -> Result<RemindReport, JobsServiceError>;

    async fn reset_usage(&self, now: DateTime<Utc>) -> Result<ResetUsageReport, JobsServiceError>;
}

#[async_trait]
impl JobsServiceApi for JobsService {
    async fn run(&self, job: JobKind, now: DateTime<Utc>) -> Result<JobReport, JobsServiceError> {
        let mut report = JobReport::default();

        if job.includes(JobKind::Expire) {
            report.expire = Some(self.expire_subscriptions(now).await?);
        }
        if job.includes(JobKind::Remind) {
            report.remind = Some(self.send_expiry_reminders(now).await?);
        }
        if job.includes(JobKind::ResetUsage) {
            report.reset_usage = Some(self.reset_usage(now).await?);
        }

        tracing::info!(job = %job.as_str(), report = ?report, "Cron job finished");
        Ok(report)
    }

    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<ExpireReport, JobsServiceError> {
        let mut report = ExpireReport::default();

        let candidates = self
            .subscription_repo
            .find_expirable(now)
            .await
            .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;

        for sub in candidates.iter().filter(|s| state::is_expirable(s, now)) {
            let expired = self
                .subscription_repo
                .expire(sub.id, now)
                .await
                .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;
            if !expired {
                continue;
            }

            report.expired += 1;
            tracing::info!(
                user_id = %sub.user_id,
                subscription_id = ?sub.paypal_subscription_id,
                tier = %sub.tier,
                "Subscription expired"
            );

            if !self.notify_expired(sub).await {
                report.emails_failed += 1;
            }
        }

        let cutoff = now - self.pending_checkout_ttl;
        let stale = self
            .subscription_repo
            .find_stale_pending(cutoff)
            .await
            .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;

        for sub in stale
            .iter()
            .filter(|s| state::is_stale_checkout(s, self.pending_checkout_ttl, now))
        {
            let settled = self
                .subscription_repo
                .settle_stale_pending(sub.id, cutoff, now)
                .await
                .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;
            if settled {
                report.stale_checkouts_settled += 1;
                tracing::info!(
                    user_id = %sub.user_id,
                    subscription_id = ?sub.paypal_subscription_id,
                    "Abandoned checkout settled to free"
                );
            }
        }

        Ok(report)
    }

    async fn send_expiry_reminders(&self, now: DateTime<Utc>) -> Result<RemindReport, JobsServiceError> {
        let mut report = RemindReport::default();
        let window = Duration::days(REMINDER_WINDOW_DAYS);

        let expiring = self
            .subscription_repo
            .find_expiring(now, now + window)
            .await
            .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;

        for sub in expiring.iter().filter(|s| state::needs_reminder(s, window, now)) {
            let Some(period_end) = sub.current_period_end else {
                continue;
            };
            let Some(user) = self.owner(sub).await? else {
                continue;
            };

            let (subject, html) = templates::renewal_reminder_email(
                &self.app_url,
                user.name.as_deref().unwrap_or_default(),
                sub.tier,
                period_end,
            );

            match self.email.send(&user.email, &subject, &html).await {
                Ok(()) => {
                    self.subscription_repo
                        .mark_reminder_sent(sub.id, now)
                        .await
                        .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;
                    report.reminders_sent += 1;
                }
                Err(e) => {
                    // Left unstamped so the next run retries
                    tracing::warn!(user_id = %sub.user_id, error = %e, "Renewal reminder not delivered");
                    report.emails_failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn reset_usage(&self, now: DateTime<Utc>) -> Result<ResetUsageReport, JobsServiceError> {
        let mut report = ResetUsageReport {
            users_reset: self
                .user_repo
                .reset_free_operations(now, first_day_of_next_month(now))
                .await
                .map_err(|e| JobsServiceError::Dependency(e.to_string()))?,
            ..Default::default()
        };

        let due = self
            .subscription_repo
            .find_usage_reset_due(now)
            .await
            .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;

        for sub in due {
            report.usage_rows_archived += self
                .usage_repo
                .archive_and_clear(sub.user_id, now)
                .await
                .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;

            self.subscription_repo
                .set_usage_reset_date(sub.id, advance_monthly(sub.usage_reset_date, now), now)
                .await
                .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;
            report.subscriptions_reset += 1;
        }

        Ok(report)
    }
}

impl JobsService {
    async fn owner(&self, sub: &Subscription) -> Result<Option<User>, JobsServiceError> {
        let user = self
            .user_repo
            .find_by_id(sub.user_id)
            .await
            .map_err(|e| JobsServiceError::Dependency(e.to_string()))?;
        if user.is_none() {
            tracing::warn!(user_id = %sub.user_id, "Subscription owner not found");
        }
        Ok(user)
    }

    /// Returns false when the notice could not be delivered
    async fn notify_expired(&self, sub: &Subscription) -> bool {
        let user = match self.owner(sub).await {
            Ok(Some(user)) => user,
            Ok(None) => return true,
            Err(e) => {
                tracing::warn!(user_id = %sub.user_id, error = %e, "Could not load owner for expiry notice");
                return false;
            }
        };

        let (subject, html) = templates::subscription_expired_email(
            &self.app_url,
            user.name.as_deref().unwrap_or_default(),
            sub.tier,
        );

        match self.email.send(&user.email, &subject, &html).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(user_id = %sub.user_id, error = %e, "Expiry notice not delivered");
                false
            }
        }
    }
}
