pub mod subscription_repository;
pub mod transaction_repository;
pub mod usage_repository;
pub mod user_repository;
pub mod webhook_event_repository;

pub use subscription_repository::{PgSubscriptionRepository, SubscriptionRepository};
pub use transaction_repository::{PgTransactionRepository, TransactionRepository};
pub use usage_repository::{PgUsageRepository, UsageRepository};
pub use user_repository::{PgUserRepository, UserRepository};
pub use webhook_event_repository::{
    NewWebhookEvent, PgWebhookEventRepository, WebhookEventRepository,
};
