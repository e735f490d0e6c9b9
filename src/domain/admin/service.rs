use super::activity::{ActivityEntry, ActivityKind, ActivityStats, ActivityStatus, TimeRange};
use super::dto::{
    ActivityQuery, ActivityResponse, AdminListQuery, LedgerOverview, Revenue, SubscriptionListResponse,
    SubscriptionOverview, SubscriptionStatsResponse, TierStats, TransactionListResponse,
    TransactionStatsResponse, UsageReportQuery, UsageReportResponse,
};
use super::error::AdminServiceError;
use super::model::{
    ActivityFilter, DailyLedger, SubscriptionFilter, TransactionFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use crate::domain::billing::TransactionStatus;
use crate::domain::subscription::{SubscriptionStatus, SubscriptionTier};
use crate::infrastructure::repositories::{
    SubscriptionRepository, TransactionRepository, UsageRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_USAGE_DAYS: i64 = 30;
const MAX_USAGE_DAYS: i64 = 365;
const TREND_DAYS: i64 = 14;

pub struct AdminService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    usage_repo: Arc<dyn UsageRepository>,
}

impl AdminService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        usage_repo: Arc<dyn UsageRepository>,
    ) -> Self {
        Self {
            subscription_repo,
            transaction_repo,
            usage_repo,
        }
    }
}

#[async_trait]
pub trait AdminServiceApi: Send + Sync {
    async fn list_subscriptions(
        &self,
        query: AdminListQuery,
    ) -> Result<SubscriptionListResponse, AdminServiceError>;

    async fn list_transactions(
        &self,
        query: AdminListQuery,
    ) -> Result<TransactionListResponse, AdminServiceError>;

    async fn usage_report(
        &self,
        query: UsageReportQuery,
    ) -> Result<UsageReportResponse, AdminServiceError>;

    /// Usage, subscription and ledger events merged newest first
    async fn activity(&self, query: ActivityQuery) -> Result<ActivityResponse, AdminServiceError>;

    async fn transaction_stats(&self) -> Result<TransactionStatsResponse, AdminServiceError>;

    async fn subscription_stats(&self) -> Result<SubscriptionStatsResponse, AdminServiceError>;
}

#[async_trait]
impl AdminServiceApi for AdminService {
    async fn list_subscriptions(
        &self,
        query: AdminListQuery,
    ) -> Result<SubscriptionListResponse, AdminServiceError> {
        let (limit, offset) = page(&query)?;
        let filter = SubscriptionFilter {
            tier: parse_filter::<SubscriptionTier>(query.tier.as_deref(), "tier")?,
            status: parse_filter::<SubscriptionStatus>(query.status.as_deref(), "status")?,
            limit,
            offset,
        };

        let (subscriptions, total) = self
            .subscription_repo
            .list(&filter)
            .await
            .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;

        Ok(SubscriptionListResponse {
            success: true,
            subscriptions,
            total,
            limit,
            offset,
        })
    }

    async fn list_transactions(
        &self,
        query: AdminListQuery,
    ) -> Result<TransactionListResponse, AdminServiceError> {
        let (limit, offset) = page(&query)?;
        let filter = TransactionFilter {
            status: parse_filter::<TransactionStatus>(query.status.as_deref(), "status")?,
            limit,
            offset,
        };

        let (transactions, total) = self
            .transaction_repo
            .list(&filter)
            .await
            .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;

        Ok(TransactionListResponse {
            success: true,
            transactions,
            total,
            limit,
            offset,
        })
    }

    async fn usage_report(
        &self,
        query: UsageReportQuery,
    ) -> Result<UsageReportResponse, AdminServiceError> {
        let days = query.days.unwrap_or(DEFAULT_USAGE_DAYS);
        if !(1..=MAX_USAGE_DAYS).contains(&days) {
            return Err(AdminServiceError::Invalid(format!(
                "days must be between 1 and {}",
                MAX_USAGE_DAYS
            )));
        }

        let since = (Utc::now() - Duration::days(days - 1)).date_naive();
        let operations = self
            .usage_repo
            .totals_since(since)
            .await
            .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;

        Ok(UsageReportResponse {
            success: true,
            days,
            since,
            total_operations: operations.iter().map(|o| o.count).sum(),
            operations,
        })
    }

    async fn activity(&self, query: ActivityQuery) -> Result<ActivityResponse, AdminServiceError> {
        let (limit, offset) = page_bounds(query.limit, query.offset)?;
        let range = match query.time_range.as_deref().filter(|s| !s.is_empty()) {
            None => TimeRange::Day,
            Some(value) => value
                .parse::<TimeRange>()
                .map_err(|_| AdminServiceError::Invalid(format!("Invalid timeRange: {}", value)))?,
        };
        let kind = parse_filter::<ActivityKind>(query.kind.as_deref(), "type")?;
        let status = parse_filter::<ActivityStatus>(query.status.as_deref(), "status")?;

        // Each source contributes at most one full window
        let filter = ActivityFilter {
            since: range.since(Utc::now()),
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            limit: offset + limit,
        };
        let wants = |k: ActivityKind| kind.map_or(true, |wanted| wanted == k);

        let mut entries: Vec<ActivityEntry> = Vec::new();
        if wants(ActivityKind::Usage) {
            let rows = self
                .usage_repo
                .activity_since(&filter)
                .await
                .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;
            entries.extend(rows.into_iter().map(ActivityEntry::from));
        }
        if wants(ActivityKind::Subscription) {
            let rows = self
                .subscription_repo
                .changed_since(&filter)
                .await
                .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;
            entries.extend(rows.into_iter().map(ActivityEntry::from));
        }
        if wants(ActivityKind::Transaction) {
            let rows = self
                .transaction_repo
                .created_since(&filter)
                .await
                .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;
            entries.extend(rows.into_iter().map(ActivityEntry::from));
        }

        if let Some(status) = status {
            entries.retain(|e| e.status == status);
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let stats = ActivityStats::tally(&entries);
        let total = entries.len() as i64;
        let activities = entries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(ActivityResponse {
            success: true,
            activities,
            total,
            limit,
            offset,
            time_range: range.as_str().to_string(),
            stats,
        })
    }

    async fn transaction_stats(&self) -> Result<TransactionStatsResponse, AdminServiceError> {
        let now = Utc::now();
        let today = now.date_naive();
        let today_start = start_of_day(today);
        let first_day = today - Duration::days(TREND_DAYS - 1);

        let totals = self
            .transaction_repo
            .totals(today_start)
            .await
            .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;
        let daily = self
            .transaction_repo
            .daily_totals(start_of_day(first_day))
            .await
            .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;

        let average_deposit = if totals.deposit_count > 0 {
            (totals.deposit_total / Decimal::from(totals.deposit_count)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let mut by_day: HashMap<_, _> = daily.into_iter().map(|d| (d.day, d)).collect();
        let trends = (0..TREND_DAYS)
            .map(|i| first_day + Duration::days(i))
            .map(|day| {
                by_day.remove(&day).unwrap_or(DailyLedger {
                    day,
                    income: Decimal::ZERO,
                    operations: 0,
                })
            })
            .collect();

        Ok(TransactionStatsResponse {
            success: true,
            overview: LedgerOverview {
                total: totals.deposit_count + totals.charge_count,
                income: totals.deposit_total,
                expenses: totals.charge_total,
                average_deposit,
                deposit_count: totals.deposit_count,
                operations_today: totals.charges_today,
                total_operations: totals.charge_count,
            },
            trends,
        })
    }

    async fn subscription_stats(&self) -> Result<SubscriptionStatsResponse, AdminServiceError> {
        let counts = self
            .subscription_repo
            .count_by_tier_and_status()
            .await
            .map_err(|e| AdminServiceError::Dependency(e.to_string()))?;

        let count_where = |status: SubscriptionStatus| -> i64 {
            counts.iter().filter(|c| c.status == status).map(|c| c.count).sum()
        };

        let by_tier: Vec<TierStats> = SubscriptionTier::ALL
            .iter()
            .map(|tier| {
                let count: i64 = counts
                    .iter()
                    .filter(|c| c.tier == *tier && c.status == SubscriptionStatus::Active)
                    .map(|c| c.count)
                    .sum();
                TierStats {
                    tier: *tier,
                    count,
                    revenue: tier.monthly_price() * Decimal::from(count),
                }
            })
            .collect();
        let monthly: Decimal = by_tier.iter().map(|t| t.revenue).sum();

        Ok(SubscriptionStatsResponse {
            success: true,
            overview: SubscriptionOverview {
                total: counts.iter().map(|c| c.count).sum(),
                active: count_where(SubscriptionStatus::Active),
                canceled: count_where(SubscriptionStatus::Canceled),
                revenue: Revenue {
                    monthly,
                    annual: monthly * Decimal::from(12),
                },
            },
            by_tier,
        })
    }
}

fn start_of_day(day: chrono::NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

fn page(query: &AdminListQuery) -> Result<(i64, i64), AdminServiceError> {
    page_bounds(query.limit, query.offset)
}

fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> Result<(i64, i64), AdminServiceError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = offset.unwrap_or(0);

    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AdminServiceError::Invalid(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    if offset < 0 {
        return Err(AdminServiceError::Invalid("offset must not be negative".to_string()));
    }
    Ok((limit, offset))
}

fn parse_filter<T: std::str::FromStr>(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<T>, AdminServiceError> {
    match raw.filter(|s| !s.is_empty() && *s != "all") {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| AdminServiceError::Invalid(format!("Invalid {}: {}", field, value))),
    }
}
