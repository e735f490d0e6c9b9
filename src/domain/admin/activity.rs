use super::model::{SubscriptionSummary, TransactionSummary, UsageActivity};
use crate::domain::billing::TransactionStatus;
use crate::domain::subscription::SubscriptionStatus;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Lookback accepted by `timeRange`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Hour,
    Day,
    Week,
    Month,
    All,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Hour => "1h",
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::All => "all",
        }
    }

    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeRange::Hour => now - Duration::hours(1),
            TimeRange::Day => now - Duration::hours(24),
            TimeRange::Week => now - Duration::days(7),
            TimeRange::Month => now - Duration::days(30),
            TimeRange::All => DateTime::<Utc>::from(std::time::UNIX_EPOCH),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeRange::Hour),
            "24h" => Ok(TimeRange::Day),
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Usage,
    Subscription,
    Transaction,
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usage" => Ok(ActivityKind::Usage),
            "subscription" => Ok(ActivityKind::Subscription),
            "transaction" => Ok(ActivityKind::Transaction),
            other => Err(format!("unknown activity type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Warning,
    Error,
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ActivityStatus::Success),
            "warning" => Ok(ActivityStatus::Warning),
            "error" => Ok(ActivityStatus::Error),
            other => Err(format!("unknown activity status: {}", other)),
        }
    }
}

/// One line of the admin activity feed
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_email: String,
    pub kind: ActivityKind,
    pub action: String,
    pub details: String,
    pub status: ActivityStatus,
}

impl From<UsageActivity> for ActivityEntry {
    fn from(row: UsageActivity) -> Self {
        Self {
            id: format!("usage-{}", row.id),
            // Counters are per day
            timestamp: Utc.from_utc_datetime(&row.date.and_time(NaiveTime::default())),
            user_id: row.user_id,
            user_name: row.name,
            user_email: row.email,
            kind: ActivityKind::Usage,
            action: "operation".to_string(),
            details: format!("{} operation ({} times)", row.operation, row.count),
            status: ActivityStatus::Success,
        }
    }
}

impl From<SubscriptionSummary> for ActivityEntry {
    fn from(row: SubscriptionSummary) -> Self {
        let (action, verb) = if row.created_at == row.updated_at {
            ("subscription.created", "Created")
        } else {
            ("subscription.updated", "Updated")
        };
        Self {
            id: format!("sub-{}", row.id),
            timestamp: row.updated_at,
            user_id: row.user_id,
            user_name: row.name,
            user_email: row.email,
            kind: ActivityKind::Subscription,
            action: action.to_string(),
            details: format!("{} {} subscription ({})", verb, row.tier, row.status.as_str()),
            status: if row.status == SubscriptionStatus::Active {
                ActivityStatus::Success
            } else {
                ActivityStatus::Warning
            },
        }
    }
}

impl From<TransactionSummary> for ActivityEntry {
    fn from(row: TransactionSummary) -> Self {
        let action = if row.amount > Decimal::ZERO { "deposit" } else { "charge" };
        Self {
            id: format!("tx-{}", row.id),
            timestamp: row.created_at,
            user_id: row.user_id,
            user_name: row.name,
            user_email: row.email,
            kind: ActivityKind::Transaction,
            action: action.to_string(),
            details: format!("{} ({})", row.description, row.amount.normalize()),
            status: match row.status {
                TransactionStatus::Completed => ActivityStatus::Success,
                TransactionStatus::Pending => ActivityStatus::Warning,
                TransactionStatus::Failed => ActivityStatus::Error,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct KindCounts {
    pub usage: i64,
    pub subscription: i64,
    pub transaction: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatusCounts {
    pub success: i64,
    pub warning: i64,
    pub error: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_activities: i64,
    pub by_type: KindCounts,
    pub by_status: StatusCounts,
}

impl ActivityStats {
    pub fn tally(entries: &[ActivityEntry]) -> Self {
        let mut stats = Self {
            total_activities: entries.len() as i64,
            ..Default::default()
        };
        for entry in entries {
            match entry.kind {
                ActivityKind::Usage => stats.by_type.usage += 1,
                ActivityKind::Subscription => stats.by_type.subscription += 1,
                ActivityKind::Transaction => stats.by_type.transaction += 1,
            }
            match entry.status {
                ActivityStatus::Success => stats.by_status.success += 1,
                ActivityStatus::Warning => stats.by_status.warning += 1,
                ActivityStatus::Error => stats.by_status.error += 1,
            }
        }
        stats
    }
}
