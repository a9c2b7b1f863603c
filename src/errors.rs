use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use thiserror::Error;
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Meme not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Database backend error: {0:#}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer

    #[error("Stored data could not be parsed: {0}")]
    DataCorruption(String),
}

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Hashing service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Hashing service returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token has no subject claim")]
    MissingSubject,
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid meme ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error("Could not validate credentials: {0}")]
    Unauthorized(#[from] AuthError),

    // Domain/Service level errors (mapped from RepoError/HashError)
    #[error("Meme not found with ID: {0}")]
    MemeNotFound(Uuid),
    #[error("Database operation failed")]
    RepositoryError(#[source] RepoError),
    #[error("Image hashing failed")]
    HashingError(#[source] HashError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => AppError::MemeNotFound(id),
            e => AppError::RepositoryError(e),
        }
    }
}

impl From<HashError> for AppError {
    fn from(err: HashError) -> Self {
        AppError::HashingError(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// Extractor rejections become 400s with the usual JSON error body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InitError(format!("IO error: {}", err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MemeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::RepositoryError(_)
            | AppError::HashingError(_)
            | AppError::ConfigError(_)
            | AppError::InitError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::InvalidUuid(e) => format!("Invalid ID format: {}", e),
            AppError::Unauthorized(_) => "Could not validate credentials".to_string(),
            AppError::MemeNotFound(id) => format!("Meme not found with ID: {}", id),

            // 5xx Server Errors. Upstream failures keep their cause for diagnosis.
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                format!("Database operation failed: {}", e)
            }
            AppError::HashingError(e) => {
                tracing::error!(error.source = ?e, "Hashing service error occurred");
                format!("Image hashing failed: {}", e)
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "Server configuration error".to_string()
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                "Server initialization error".to_string()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "An internal server error occurred".to_string()
            }
        };

        if status.is_server_error() {
            tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");
        } else {
            tracing::warn!(error.message = %error_message, error.detail = %self, "Rejecting request");
        }

        let body = Json(serde_json::json!({ "error": error_message }));
        if matches!(self, AppError::Unauthorized(_)) {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}

/// Response for a handler that panicked, used with `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::InternalServerError(format!("handler panicked: {}", detail)).into_response()
}
