use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

const PAYPAL_SANDBOX_API: &str = "https://api-m.sandbox.paypal.com";
const PAYPAL_LIVE_API: &str = "https://api-m.paypal.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: Environment,
    /// Pass payment-provider error text through to clients
    pub expose_provider_errors: bool,
    pub log_format: LogFormat,
    pub app_url: String,
    pub cron_secret: String,
    // PayPal
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_api_base: String,
    pub paypal_webhook_id: Option<String>,
    pub plans: PlanIds,
    // Email
    pub resend_api_key: Option<String>,
    pub email_from: String,
    // Billing
    pub min_deposit: Decimal,
    pub pending_checkout_ttl_hours: i64,
}

/// PayPal billing plan ids, one per paid tier
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanIds {
    pub basic: String,
    pub pro: String,
    pub enterprise: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .as_str()
        {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let default_paypal_api = match environment {
            Environment::Production => PAYPAL_LIVE_API,
            Environment::Development => PAYPAL_SANDBOX_API,
        };

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            expose_provider_errors: match env::var("EXPOSE_PROVIDER_ERRORS") {
                Ok(value) => value.parse()?,
                Err(_) => environment == Environment::Development,
            },
            environment,
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            cron_secret: env::var("CRON_SECRET")?,
            paypal_client_id: env::var("PAYPAL_CLIENT_ID")?,
            paypal_client_secret: env::var("PAYPAL_CLIENT_SECRET")?,
            paypal_api_base: env::var("PAYPAL_API_BASE")
                .unwrap_or_else(|_| default_paypal_api.to_string()),
            paypal_webhook_id: env::var("PAYPAL_WEBHOOK_ID").ok().filter(|v| !v.is_empty()),
            plans: PlanIds {
                basic: env::var("PAYPAL_PLAN_BASIC").unwrap_or_default(),
                pro: env::var("PAYPAL_PLAN_PRO").unwrap_or_default(),
                enterprise: env::var("PAYPAL_PLAN_ENTERPRISE").unwrap_or_default(),
            },
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|v| !v.is_empty()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "MegaPDF <billing@mega-pdf.com>".to_string()),
            min_deposit: Decimal::from_str(
                &env::var("MIN_DEPOSIT").unwrap_or_else(|_| "5.00".to_string()),
            )?,
            pending_checkout_ttl_hours: env::var("PENDING_CHECKOUT_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
