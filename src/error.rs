// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::services::crypto::CryptoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("ESO API error: {0}")]
    EsoApi(String),

    #[error("Credential encryption error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message used when the ESO API rejects the stored username/password.
    pub const ESO_AUTH_FAILED: &'static str = "ESO authentication failed";

    /// Whether the error came from the ESO API refusing the credentials.
    pub fn is_eso_auth_error(&self) -> bool {
        matches!(self, AppError::EsoApi(msg) if msg == Self::ESO_AUTH_FAILED)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::EsoApi(msg) => (StatusCode::BAD_GATEWAY, "eso_error", Some(msg.clone())),
            AppError::Crypto(CryptoError::StaleKey) => {
                (StatusCode::UNAUTHORIZED, "stale_session", None)
            }
            AppError::Crypto(err) => {
                tracing::error!(error = %err, "Credential encryption error");
                (StatusCode::INTERNAL_SERVER_ERROR, "credential_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
