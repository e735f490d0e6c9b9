use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

const PROVIDER_FAILED: &str = "Payment provider request failed";

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Payment provider error: {0}")]
    ExternalService(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error envelope returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Internal and provider details never
    /// reach the body here; see `provider_error_detail`.
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::PaymentRequired(msg) => msg.clone(),
            Self::ExternalService(_) => PROVIDER_FAILED.to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.public_message(),
        }
    }
}

/// Implement IntoResponse for automatic conversion in handlers
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(
            error = %self,
            status = %status.as_u16(),
            "Request failed"
        );

        let mut response = (status, Json(self.to_response())).into_response();
        if let Self::ExternalService(detail) = self {
            response.extensions_mut().insert(ProviderErrorDetail(detail));
        }
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// Provider error text carried on a 502 response for `provider_error_detail`
#[derive(Debug, Clone)]
pub struct ProviderErrorDetail(pub String);

/// Response mapper installed with the `expose_provider_errors` setting.
/// When enabled, 502 bodies include what the provider said.
pub async fn provider_error_detail(State(expose): State<bool>, mut response: Response) -> Response {
    let Some(ProviderErrorDetail(detail)) = response.extensions_mut().remove::<ProviderErrorDetail>() else {
        return response;
    };
    if !expose {
        return response;
    }

    let body = ErrorResponse {
        success: false,
        error: format!("{}: {}", PROVIDER_FAILED, detail),
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    let detailed = Json(body).into_response();
    Response::from_parts(parts, detailed.into_body())
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
