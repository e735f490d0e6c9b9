use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use megapdf_billing::controllers::{
    admin::AdminController, billing::BillingController, cron::CronController,
    operations::OperationsController, subscription::SubscriptionController,
    webhook::WebhookController,
};
use megapdf_billing::domain::{
    admin::AdminService, billing::BillingService, jobs::JobsService,
    subscription::SubscriptionService, webhook::WebhookService,
};
use megapdf_billing::infrastructure::config::{Config, LogFormat};
use megapdf_billing::infrastructure::db::{check_connection, create_pool, run_migrations};
use megapdf_billing::infrastructure::email::{EmailSender, LogEmailSender, ResendEmailSender};
use megapdf_billing::infrastructure::http::{build_router, start_http_server, Controllers};
use megapdf_billing::infrastructure::payments::{PayPalClient, PaymentGateway};
use megapdf_billing::infrastructure::repositories::{
    PgSubscriptionRepository, PgTransactionRepository, PgUsageRepository, PgUserRepository,
    PgWebhookEventRepository, SubscriptionRepository, TransactionRepository, UsageRepository,
    UserRepository, WebhookEventRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting MegaPDF billing on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    for (tier, plan_id) in [
        ("basic", &config.plans.basic),
        ("pro", &config.plans.pro),
        ("enterprise", &config.plans.enterprise),
    ] {
        if plan_id.is_empty() {
            tracing::warn!(tier = tier, "No PayPal plan configured, checkouts for this tier will fail");
        }
    }

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject db pool)
    tracing::info!("Instantiating repositories...");
    let user_repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let subscription_repo: Arc<dyn SubscriptionRepository> =
        Arc::new(PgSubscriptionRepository::new(pool.clone()));
    let transaction_repo: Arc<dyn TransactionRepository> =
        Arc::new(PgTransactionRepository::new(pool.clone()));
    let usage_repo: Arc<dyn UsageRepository> = Arc::new(PgUsageRepository::new(pool.clone()));
    let webhook_event_repo: Arc<dyn WebhookEventRepository> =
        Arc::new(PgWebhookEventRepository::new(pool.clone()));

    // 2. Instantiate external clients
    tracing::info!(api_base = %config.paypal_api_base, "Instantiating PayPal client...");
    let gateway: Arc<dyn PaymentGateway> = Arc::new(PayPalClient::new(
        config.paypal_api_base.clone(),
        config.paypal_client_id.clone(),
        config.paypal_client_secret.clone(),
        config.app_url.clone(),
    ));

    let email_sender: Arc<dyn EmailSender> = match &config.resend_api_key {
        Some(api_key) => Arc::new(ResendEmailSender::new(api_key.clone(), config.email_from.clone())),
        None => {
            tracing::warn!("RESEND_API_KEY not set, billing emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    if config.paypal_webhook_id.is_none() {
        tracing::warn!("PAYPAL_WEBHOOK_ID not set, webhook signatures will not be verified");
    }

    // 3. Instantiate services (inject repositories and clients)
    tracing::info!("Instantiating services...");
    let subscription_service = Arc::new(SubscriptionService::new(
        subscription_repo.clone(),
        gateway.clone(),
        config.plans.clone(),
    ));
    let billing_service = Arc::new(BillingService::new(
        user_repo.clone(),
        transaction_repo.clone(),
        usage_repo.clone(),
        gateway.clone(),
        config.min_deposit,
    ));
    let webhook_service = Arc::new(WebhookService::new(
        webhook_event_repo,
        billing_service.clone(),
        subscription_service.clone(),
        gateway.clone(),
        config.paypal_webhook_id.clone(),
    ));
    let jobs_service = Arc::new(JobsService::new(
        user_repo.clone(),
        subscription_repo.clone(),
        usage_repo.clone(),
        email_sender,
        config.app_url.clone(),
        config.pending_checkout_ttl_hours,
    ));
    let admin_service = Arc::new(AdminService::new(
        subscription_repo,
        transaction_repo,
        usage_repo,
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let controllers = Controllers {
        subscription: Arc::new(SubscriptionController::new(subscription_service)),
        billing: Arc::new(BillingController::new(billing_service.clone())),
        operations: Arc::new(OperationsController::new(billing_service)),
        webhook: Arc::new(WebhookController::new(webhook_service)),
        cron: Arc::new(CronController::new(jobs_service)),
        admin: Arc::new(AdminController::new(admin_service)),
    };

    // Start HTTP server with all routes
    let app = build_router(pool, config.clone(), user_repo, controllers);
    start_http_server(config, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "megapdf_billing=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "megapdf_billing=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
