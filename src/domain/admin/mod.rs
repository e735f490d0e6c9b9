pub mod activity;
pub mod dto;
pub mod error;
pub mod model;
pub mod service;

pub use activity::{ActivityEntry, ActivityKind, ActivityStats, ActivityStatus, TimeRange};
pub use dto::{
    ActivityQuery, ActivityResponse, AdminListQuery, SubscriptionListResponse,
    SubscriptionStatsResponse, TransactionListResponse, TransactionStatsResponse, UsageReportQuery,
    UsageReportResponse,
};
pub use error::AdminServiceError;
pub use model::{
    ActivityFilter, DailyLedger, LedgerTotals, SubscriptionFilter, SubscriptionSummary, TierStatusCount,
    TransactionFilter, TransactionSummary, UsageActivity,
};
pub use service::{AdminService, AdminServiceApi};
