//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error
//! variants. Every error is terminal to the triggering action and carries a
//! distinguishable `code`, so a caller can tell "you can't do that yet"
//! (validation/concurrency) apart from "this document isn't genuine"
//! (hash mismatch) apart from "try again" (render/storage).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::store::StoreError;
use reconnect_core::CoreError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required field or signature missing/invalid at submission time;
    /// rejected before any storage call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing or malformed identity context
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not a participant of the targeted agreement
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Lookup against an unknown agreement ID
    #[error("Not found: {0}")]
    NotFound(String),

    /// The targeted agreement's status has already advanced past the
    /// actor's expected precondition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The agreement has not reached `completed`; nothing to verify or issue
    #[error("Agreement incomplete: {0}")]
    Incomplete(String),

    /// Recomputed hash disagrees with the sealed one: tampering or corruption
    #[error("Hash mismatch: sealed {expected}, recomputed {recomputed}")]
    HashMismatch { expected: String, recomputed: String },

    /// The document failed to rasterize; no partial file is produced
    #[error("Render failed: {0}")]
    Render(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage backend is not reachable
    #[error("Storage unavailable: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Incomplete(_) | Self::HashMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Render(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONCURRENT_UPDATE",
            Self::Incomplete(_) => "INCOMPLETE_AGREEMENT",
            Self::HashMismatch { .. } => "HASH_MISMATCH",
            Self::Render(_) => "RENDER_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            // A transition refused because the record moved on, or a
            // write-once field already holds a value.
            CoreError::InvalidTransition { .. }
            | CoreError::AlreadySigned { .. }
            | CoreError::MissingSignature { .. }
            | CoreError::AlreadySealed => Self::Conflict(err.to_string()),

            CoreError::NotParticipant(_) | CoreError::NotAuthor { .. } => {
                Self::Forbidden(err.to_string())
            }

            CoreError::SameParty | CoreError::MalformedPayload(_) => {
                Self::Validation(err.to_string())
            }

            CoreError::SerializationError(_) | CoreError::SealMissing => {
                Self::Internal(err.to_string())
            }

            CoreError::Render(e) => Self::Render(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(format!("agreement {id} not found")),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Connection(msg) | StoreError::Migration(msg) => Self::Storage(msg),
            StoreError::Query(msg) | StoreError::Corrupt(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        // Log based on severity, always including the code.
        match &self {
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::Conflict(_)
            | Self::Incomplete(_) => {
                tracing::warn!(status = %status, code = code, error = %message, "Client error");
            }
            Self::Unauthorized(_) | Self::Forbidden(_) => {
                tracing::warn!(status = %status, code = code, error = %message, "Auth error");
            }
            Self::HashMismatch { .. } => {
                tracing::warn!(status = %status, code = code, error = %message, "Integrity failure");
            }
            Self::Render(_) | Self::Internal(_) | Self::Storage(_) => {
                tracing::error!(status = %status, code = code, error = %message, "Server error");
            }
        }

        // All error responses include a `code` field for programmatic
        // error handling.
        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
