use crate::domain::billing::TransactionStatus;
use crate::domain::subscription::{SubscriptionStatus, SubscriptionTier};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// Subscription joined with its owner
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub paypal_subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger row joined with its owner
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub status: TransactionStatus,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Window for the admin activity feed. `search` matches email or name,
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    pub since: DateTime<Utc>,
    pub search: Option<String>,
    pub limit: i64,
}

impl ActivityFilter {
    pub fn matches(&self, email: &str, name: Option<&str>) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let term = term.to_lowercase();
        email.to_lowercase().contains(&term)
            || name.is_some_and(|n| n.to_lowercase().contains(&term))
    }

    /// `ILIKE` pattern for the search term
    pub fn pattern(&self) -> Option<String> {
        self.search.as_ref().map(|term| {
            let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            format!("%{}%", escaped)
        })
    }
}

/// One day of usage counters joined with its owner
#[derive(Debug, Clone, FromRow)]
pub struct UsageActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub operation: String,
    pub date: NaiveDate,
    pub count: i32,
}

/// Subscription rows per tier and status
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct TierStatusCount {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub count: i64,
}

/// Completed ledger totals. Charges are reported as positive amounts.
#[derive(Debug, Clone, Default, FromRow, PartialEq)]
pub struct LedgerTotals {
    pub deposit_total: Decimal,
    pub deposit_count: i64,
    pub charge_total: Decimal,
    pub charge_count: i64,
    pub charges_today: i64,
}

/// Completed deposits and charges for one UTC day
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct DailyLedger {
    pub day: NaiveDate,
    pub income: Decimal,
    pub operations: i64,
}
