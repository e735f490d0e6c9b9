use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::provider_error_detail;
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::{
    controllers::{
        admin::AdminController, billing::BillingController, cron::CronController, health,
        operations::OperationsController, subscription::SubscriptionController,
        webhook::WebhookController,
    },
    infrastructure::auth::{
        admin_middleware, auth_middleware, cron_secret_middleware, request_id_middleware,
    },
};

use crate::infrastructure::repositories::UserRepository;

/// Controllers mounted by the router
pub struct Controllers {
    pub subscription: Arc<SubscriptionController>,
    pub billing: Arc<BillingController>,
    pub operations: Arc<OperationsController>,
    pub webhook: Arc<WebhookController>,
    pub cron: Arc<CronController>,
    pub admin: Arc<AdminController>,
}

/// Build the application router with every route and middleware layer
pub fn build_router(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    user_repo: Arc<dyn UserRepository>,
    controllers: Controllers,
) -> Router {
    // Subscription routes (require authentication)
    let subscription_routes = Router::new()
        .route(
            "/api/subscription",
            get(SubscriptionController::get_subscription).post(SubscriptionController::create_subscription),
        )
        .route("/api/subscription/upgrade", post(SubscriptionController::upgrade))
        .route("/api/subscription/cancel", post(SubscriptionController::cancel))
        .route("/api/subscription/reset-pending", post(SubscriptionController::reset_pending))
        .route("/api/subscription/verify", get(SubscriptionController::verify))
        .with_state(controllers.subscription)
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Balance and deposit routes (require authentication)
    let billing_routes = Router::new()
        .route("/api/user/balance", get(BillingController::get_balance))
        .route("/api/user/deposit", post(BillingController::create_deposit))
        .route("/api/user/deposit/verify", post(BillingController::verify_deposit))
        .with_state(controllers.billing)
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Metered operation routes (require authentication)
    let operation_routes = Router::new()
        .route("/api/operations/check", post(OperationsController::check))
        .route("/api/operations/process", post(OperationsController::process))
        .with_state(controllers.operations)
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Admin routes: authentication runs first, then the role check
    let admin_routes = Router::new()
        .route("/api/admin/subscriptions", get(AdminController::list_subscriptions))
        .route("/api/admin/transactions", get(AdminController::list_transactions))
        .route("/api/admin/usage", get(AdminController::usage_report))
        .route("/api/admin/activity", get(AdminController::activity))
        .route("/api/admin/transactions/stats", get(AdminController::transaction_stats))
        .route("/api/admin/subscriptions/stats", get(AdminController::subscription_stats))
        .with_state(controllers.admin)
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Cron route (shared secret)
    let cron_routes = Router::new()
        .route(
            "/api/cron/subscriptions",
            get(CronController::run).post(CronController::run),
        )
        .with_state(controllers.cron)
        .layer(middleware::from_fn_with_state(
            config.clone(),
            cron_secret_middleware,
        ));

    // Webhook route (public, signature checked in the service)
    let webhook_routes = Router::new()
        .route("/api/webhooks/paypal", post(WebhookController::paypal))
        .with_state(controllers.webhook);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool)
        .merge(subscription_routes)
        .merge(billing_routes)
        .merge(operation_routes)
        .merge(admin_routes)
        .merge(cron_routes)
        .merge(webhook_routes)
        .layer(middleware::map_response_with_state(
            config.expose_provider_errors,
            provider_error_detail,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    app: Router,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
