// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Error Taxonomy
//!
//! Every handler returns a [`ControllerError`] instead of deciding wire
//! status codes itself. The single [`IntoResponse`] implementation below is
//! the shared translator for both the REST and RPC transports, so the same
//! underlying failure always produces the same response shape.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::repository::RepositoryError;

/// Fixed message carried by every drain-time 503.
pub const SHUTDOWN_MESSAGE: &str = "controller: shutting down";

#[derive(Debug, Error)]
pub enum ControllerError {
    /// User input rejected; one occurrence per offending field.
    #[error("validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    /// The not-found sentinel, rendered as an empty 404 for every kind.
    #[error("object not found")]
    NotFound,

    /// Produced only by the multiplexer's drain check, never by handlers.
    #[error("{SHUTDOWN_MESSAGE}")]
    Shutdown,

    /// No detail is ever attached: the reason verification failed must not
    /// leak to the client.
    #[error("unauthorized")]
    Unauthorized,

    /// Opaque internal failure; the message is not stable across versions.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ControllerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }
}

impl From<RepositoryError> for ControllerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Validation { field, message } => Self::Validation { field, message },
            RepositoryError::Conflict(message) => Self::validation("id", message),
            RepositoryError::Storage(message) => Self::Internal(anyhow::anyhow!(message)),
        }
    }
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "code": "validation_error",
                    "field": field,
                    "message": message,
                })),
            )
                .into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Shutdown => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::CONTENT_TYPE, "application/json")],
                Json(json!({
                    "code": "unavailable",
                    "message": SHUTDOWN_MESSAGE,
                })),
            )
                .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "code": "internal_error",
                        "message": "something went wrong",
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_not_found_maps_to_sentinel() {
        let err: ControllerError = RepositoryError::NotFound.into();
        assert!(matches!(err, ControllerError::NotFound));
    }

    #[test]
    fn validation_keeps_field_and_message() {
        let err: ControllerError = RepositoryError::Validation {
            field: "name".into(),
            message: "must not be empty".into(),
        }
        .into();
        match err {
            ControllerError::Validation { field, message } => {
                assert_eq!(field, "name");
                assert_eq!(message, "must not be empty");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
