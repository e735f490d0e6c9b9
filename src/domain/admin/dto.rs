use super::activity::{ActivityEntry, ActivityStats};
use super::model::{DailyLedger, SubscriptionSummary, TransactionSummary};
use crate::domain::billing::OperationCount;
use crate::domain::subscription::SubscriptionTier;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Query string accepted by the admin list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub tier: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageReportQuery {
    pub days: Option<i64>,
}

/// Query string of GET /api/admin/activity
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub time_range: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionListResponse {
    pub success: bool,
    pub subscriptions: Vec<SubscriptionSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub success: bool,
    pub transactions: Vec<TransactionSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReportResponse {
    pub success: bool,
    pub days: i64,
    pub since: NaiveDate,
    pub total_operations: i64,
    pub operations: Vec<OperationCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub success: bool,
    pub activities: Vec<ActivityEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub time_range: String,
    pub stats: ActivityStats,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerOverview {
    /// Completed deposits plus completed charges
    pub total: i64,
    pub income: Decimal,
    pub expenses: Decimal,
    pub average_deposit: Decimal,
    pub deposit_count: i64,
    pub operations_today: i64,
    pub total_operations: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatsResponse {
    pub success: bool,
    pub overview: LedgerOverview,
    /// One entry per day, oldest first, today last
    pub trends: Vec<DailyLedger>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Revenue {
    pub monthly: Decimal,
    pub annual: Decimal,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SubscriptionOverview {
    pub total: i64,
    pub active: i64,
    pub canceled: i64,
    pub revenue: Revenue,
}

/// Active subscriptions of one tier at list price
#[derive(Debug, Serialize, PartialEq)]
pub struct TierStats {
    pub tier: SubscriptionTier,
    pub count: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatsResponse {
    pub success: bool,
    pub overview: SubscriptionOverview,
    pub by_tier: Vec<TierStats>,
}
