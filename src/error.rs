//! # Error Handling
//!
//! This module provides unified error handling for the Maison Graph API:
//! the typed [`GraphError`] taxonomy produced by the engine, and the
//! problem+json [`ApiError`] response format with trace ID propagation.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::connection::PairStatus;
use crate::models::introduction_request::IntroductionStatus;
use crate::telemetry;

/// Typed failures surfaced by the graph engine. Every guard and constraint
/// failure carries enough context for a client to render the correct next
/// action; only store-level transport failures map to `Unavailable`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("a profile cannot connect to itself")]
    SelfReference,

    /// An edge already exists for the pair; carries the status from the
    /// caller's perspective.
    #[error("a connection already exists for this pair")]
    AlreadyExists {
        connection_id: Uuid,
        status: PairStatus,
    },

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("the caller is not allowed to {action}")]
    Forbidden { action: &'static str },

    #[error("connection is already accepted")]
    AlreadyAccepted,

    /// Catch-all for lifecycle transitions not valid from the current status.
    #[error("transition is not valid from status '{current}'")]
    InvalidTransition { current: &'static str },

    #[error("requester, introducer and target must be three distinct profiles")]
    InvalidParticipants,

    #[error("introducer is not connected to both the requester and the target")]
    IntroducerNotEligible,

    #[error("requester and target are already connected")]
    AlreadyConnected,

    /// An open, non-expired request already exists for the pair.
    #[error("an introduction request for this pair is already open")]
    DuplicateRequest { request_id: Uuid },

    #[error("introduction request is not awaiting an introducer response")]
    NotRespondable {
        status: IntroductionStatus,
        expired: bool,
    },

    #[error("introduction request can no longer be cancelled")]
    NotCancellable {
        status: IntroductionStatus,
        expired: bool,
    },

    #[error("introduction has not been made yet")]
    NotYetIntroduced { status: IntroductionStatus },

    /// Transient store failure; callers should retry with backoff.
    #[error("storage unavailable")]
    Unavailable(#[source] sea_orm::DbErr),

    /// Unexpected store failure.
    #[error("storage error")]
    Store(#[source] sea_orm::DbErr),
}

impl From<sea_orm::DbErr> for GraphError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                GraphError::Unavailable(err)
            }
            _ => GraphError::Store(err),
        }
    }
}

/// Detect a unique-constraint violation inside a SeaORM error, across the
/// Postgres and SQLite backends the service runs on.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // Fallback: generate a correlation ID for basic client-server log correlation
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<GraphError> for ApiError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::InvalidInput { field, message } => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
                    .with_details(json!({ "field": field }))
            }
            GraphError::SelfReference => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_REFERENCE",
                "A profile cannot connect to itself",
            ),
            GraphError::AlreadyExists {
                connection_id,
                status,
            } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "ALREADY_EXISTS",
                "A connection already exists for this pair",
            )
            .with_details(json!({
                "connection_id": connection_id,
                "status": status.as_str(),
            })),
            GraphError::NotFound { resource } => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("{} not found", resource),
            ),
            GraphError::Forbidden { action } => ApiError::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                &format!("The caller is not allowed to {}", action),
            ),
            GraphError::AlreadyAccepted => ApiError::new(
                StatusCode::BAD_REQUEST,
                "ALREADY_ACCEPTED",
                "Connection is already accepted",
            ),
            GraphError::InvalidTransition { current } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_STATE_TRANSITION",
                "Transition is not valid from the current status",
            )
            .with_details(json!({ "status": current })),
            GraphError::InvalidParticipants => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_PARTICIPANTS",
                "Requester, introducer and target must be three distinct profiles",
            ),
            GraphError::IntroducerNotEligible => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INTRODUCER_NOT_ELIGIBLE",
                "Introducer is not connected to both the requester and the target",
            ),
            GraphError::AlreadyConnected => ApiError::new(
                StatusCode::BAD_REQUEST,
                "ALREADY_CONNECTED",
                "Requester and target are already connected",
            ),
            GraphError::DuplicateRequest { request_id } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "DUPLICATE_REQUEST",
                "An introduction request for this pair is already open",
            )
            .with_details(json!({ "request_id": request_id })),
            GraphError::NotRespondable { status, expired } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "NOT_RESPONDABLE",
                "Introduction request is not awaiting an introducer response",
            )
            .with_details(json!({ "status": status.as_str(), "expired": expired })),
            GraphError::NotCancellable { status, expired } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "NOT_CANCELLABLE",
                "Introduction request can no longer be cancelled",
            )
            .with_details(json!({ "status": status.as_str(), "expired": expired })),
            GraphError::NotYetIntroduced { status } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "NOT_YET_INTRODUCED",
                "Introduction has not been made yet",
            )
            .with_details(json!({ "status": status.as_str() })),
            GraphError::Unavailable(err) => {
                tracing::error!(error = ?err, "Storage unavailable");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UNAVAILABLE",
                    "Storage temporarily unavailable",
                )
                .with_retry_after(5)
            }
            GraphError::Store(err) => {
                tracing::error!(error = ?err, "Storage error");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Storage error occurred",
                )
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        ApiError::from(GraphError::from(error))
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create an unauthorized error (401) with explicit trace_id
pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    let mut error = ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}
