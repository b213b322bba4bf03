//! Error types for the HTTP API.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use trust_core::CoreError;
use trust_store::StoreError;
use trust_token::TokenError;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the HTTP API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or malformed request fields.
    #[error("{message}")]
    Validation {
        /// What is wrong with the request.
        message: String,
    },

    /// Bad signature, rejected proof or invalid session.
    #[error("{message}")]
    Authentication {
        /// Why the credential was rejected.
        message: String,
    },

    /// Spend exceeds the available balance.
    #[error("insufficient TRH balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Amount the spend asked for.
        required: u64,
        /// Amount available.
        available: u64,
    },

    /// Resource not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Requested ID.
        id: String,
    },

    /// The ledger or the identity service failed.
    #[error("upstream error: {message}")]
    Upstream {
        /// Description of the failure.
        message: String,
    },

    /// The document store is unreachable.
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Failed to bind the listener.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl GatewayError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create an upstream error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status and machine-readable error kind.
    #[must_use]
    pub const fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Authentication { .. } => (StatusCode::UNAUTHORIZED, "authentication_error"),
            Self::InsufficientBalance { .. } => (StatusCode::PAYMENT_REQUIRED, "insufficient_balance"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Self::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::Unavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            Self::Config { .. } | Self::BindFailed(_, _) | Self::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientBalance {
                required,
                available,
            } => Self::InsufficientBalance {
                required,
                available,
            },
            TokenError::InvalidAddress { message } => Self::Validation { message },
            TokenError::InvalidAmount { message } => Self::Validation { message },
            TokenError::InvalidSignature { message } => Self::Authentication { message },
            TokenError::Ledger { message } => Self::Upstream { message },
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => Self::Unavailable {
                message: err.to_string(),
            },
            StoreError::NotFound { .. } => Self::not_found("record", err.to_string()),
            StoreError::Conflict { .. } | StoreError::InvalidFilter { .. } => {
                Self::validation(err.to_string())
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<CoreError> for GatewayError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { .. } => Self::validation(err.to_string()),
            CoreError::NotFound { kind, id } => Self::not_found(kind, id),
            CoreError::Store(e) => e.into(),
            CoreError::Token(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<u64>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let (required, available) = match &self {
            Self::InsufficientBalance {
                required,
                available,
            } => (Some(*required), Some(*available)),
            _ => (None, None),
        };
        let body = ErrorResponse {
            error: error_type,
            details: self.to_string(),
            required,
            available,
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","details":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}
