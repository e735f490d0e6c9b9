use crate::domain::admin::{ActivityFilter, SubscriptionFilter, SubscriptionSummary, TierStatusCount};
use crate::domain::billing::quota::first_day_of_next_month;
use crate::domain::subscription::Subscription;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_paypal_id(&self, paypal_subscription_id: &str) -> AppResult<Option<Subscription>>;

    /// The user's row, created as free/active on first access
    async fn get_or_create(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Subscription>;

    /// Persist every mutable column of `subscription`
    async fn save(&self, subscription: &Subscription) -> AppResult<Subscription>;

    /// Active paid rows whose period ended before `now`
    async fn find_expirable(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>>;

    /// Move a lapsed row to free/expired. Returns false when the row no
    /// longer qualifies, so repeated runs are no-ops.
    async fn expire(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    /// Pending rows untouched since `cutoff`
    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Subscription>>;

    /// Settle a stale pending row to free/active, unless it moved on meanwhile
    async fn settle_stale_pending(
        &self,
        id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Active paid rows whose period ends within `[now, until]`
    async fn find_expiring(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>>;

    async fn mark_reminder_sent(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    async fn find_usage_reset_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>>;

    async fn set_usage_reset_date(
        &self,
        id: Uuid,
        usage_reset_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    async fn list(&self, filter: &SubscriptionFilter) -> AppResult<(Vec<SubscriptionSummary>, i64)>;

    /// Subscriptions changed inside the activity window, newest first
    async fn changed_since(&self, filter: &ActivityFilter) -> AppResult<Vec<SubscriptionSummary>>;

    async fn count_by_tier_and_status(&self) -> AppResult<Vec<TierStatusCount>>;
}

pub struct PgSubscriptionRepository {
    pool: Arc<DbPool>,
}

impl PgSubscriptionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_paypal_id(&self, paypal_subscription_id: &str) -> AppResult<Option<Subscription>> {
        let pool = self.pool.as_ref();
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE paypal_subscription_id = $1",
        )
        .bind(paypal_subscription_id)
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    async fn get_or_create(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Subscription> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, tier, status, usage_reset_date, created_at, updated_at)
            VALUES ($1, $2, 'free', 'active', $3, $4, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(first_day_of_next_month(now))
        .bind(now)
        .execute(pool)
        .await?;

        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(subscription)
    }

    async fn save(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let pool = self.pool.as_ref();
        let saved = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET tier = $2,
                status = $3,
                paypal_subscription_id = $4,
                paypal_plan_id = $5,
                current_period_start = $6,
                current_period_end = $7,
                canceled_at = $8,
                usage_reset_date = $9,
                reminder_sent_at = $10,
                updated_at = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.tier.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.paypal_subscription_id.as_deref())
        .bind(subscription.paypal_plan_id.as_deref())
        .bind(subscription.current_period_start)
        .bind(subscription.current_period_end)
        .bind(subscription.canceled_at)
        .bind(subscription.usage_reset_date)
        .bind(subscription.reminder_sent_at)
        .bind(subscription.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(saved)
    }

    async fn find_expirable(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE status = 'active' AND tier <> 'free' AND current_period_end < $1
            ORDER BY current_period_end
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn expire(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET tier = 'free',
                status = 'expired',
                paypal_subscription_id = NULL,
                paypal_plan_id = NULL,
                updated_at = $2
            WHERE id = $1 AND status = 'active' AND tier <> 'free' AND current_period_end < $2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Subscription>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE status = 'pending' AND updated_at < $1",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn settle_stale_pending(
        &self,
        id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET tier = 'free',
                status = 'active',
                paypal_subscription_id = NULL,
                paypal_plan_id = NULL,
                current_period_start = NULL,
                current_period_end = NULL,
                updated_at = $3
            WHERE id = $1 AND status = 'pending' AND updated_at < $2
            "#,
        )
        .bind(id)
        .bind(cutoff)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_expiring(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE status = 'active'
              AND tier <> 'free'
              AND current_period_end >= $1
              AND current_period_end <= $2
            ORDER BY current_period_end
            "#,
        )
        .bind(now)
        .bind(until)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn mark_reminder_sent(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query("UPDATE subscriptions SET reminder_sent_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn find_usage_reset_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Subscription>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE usage_reset_date < $1",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn set_usage_reset_date(
        &self,
        id: Uuid,
        usage_reset_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query("UPDATE subscriptions SET usage_reset_date = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(usage_reset_date)
            .bind(now)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn list(&self, filter: &SubscriptionFilter) -> AppResult<(Vec<SubscriptionSummary>, i64)> {
        let pool = self.pool.as_ref();
        let tier = filter.tier.map(|t| t.as_str());
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, SubscriptionSummary>(
            r#"
            SELECT s.id, s.user_id, u.email, u.name, s.tier, s.status,
                   s.paypal_subscription_id, s.current_period_start, s.current_period_end,
                   s.canceled_at, s.created_at, s.updated_at
            FROM subscriptions s
            JOIN users u ON u.id = s.user_id
            WHERE ($1::text IS NULL OR s.tier = $1)
              AND ($2::text IS NULL OR s.status = $2)
            ORDER BY s.updated_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tier)
        .bind(status)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM subscriptions
            WHERE ($1::text IS NULL OR tier = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(tier)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok((rows, total))
    }

    async fn changed_since(&self, filter: &ActivityFilter) -> AppResult<Vec<SubscriptionSummary>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, SubscriptionSummary>(
            r#"
            SELECT s.id, s.user_id, u.email, u.name, s.tier, s.status,
                   s.paypal_subscription_id, s.current_period_start, s.current_period_end,
                   s.canceled_at, s.created_at, s.updated_at
            FROM subscriptions s
            JOIN users u ON u.id = s.user_id
            WHERE s.updated_at >= $1
              AND ($2::text IS NULL OR u.email ILIKE $2 OR u.name ILIKE $2)
            ORDER BY s.updated_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.since)
        .bind(filter.pattern())
        .bind(filter.limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn count_by_tier_and_status(&self) -> AppResult<Vec<TierStatusCount>> {
        let pool = self.pool.as_ref();
        let rows = sqlx::query_as::<_, TierStatusCount>(
            r#"
            SELECT tier, status, COUNT(*) AS count
            FROM subscriptions
            GROUP BY tier, status
            ORDER BY tier, status
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
