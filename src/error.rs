//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-keyed validation reasons, ordered for stable output.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("validation failed")]
    Validation(FieldErrors),
    /// Primary key lookup under a tenant scope found nothing. Also covers keys owned by another tenant.
    #[error("not found: {table} {pk}")]
    NotFound { table: String, pk: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), reason.into());
        AppError::Validation(errors)
    }

    pub fn not_found(table: &str, pk: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            table: table.to_string(),
            pk: pk.to_string(),
        }
    }

    /// Field errors when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Internal server error.".to_string(),
                None,
            ),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Validation failed.".to_string(),
                serde_json::to_value(errors).ok(),
            ),
            AppError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Not found.".to_string(),
                Some(serde_json::json!({ "id": "not found" })),
            ),
            AppError::Db(e) => {
                tracing::error!(error = %e, "database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Internal server error.".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
