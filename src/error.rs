//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across handlers and the
//! record store, along with the HTTP status and response-body mappings.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Display, Formatter};

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<S: Into<String>>(field: S, message: S) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Field validation failures, accumulated per field. HTTP 400.
    Validation { errors: Vec<FieldError> },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    /// Not authenticated, or acting on a resource the actor does not own.
    Auth { code: String, message: String },
    /// Authenticated but lacking the required permission.
    Forbidden { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::Validation { errors } => errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Internal { message, .. } => message.clone(),
        }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self { AppError::Validation { errors } }
    pub fn field<S: Into<String>>(field: S, msg: S) -> Self {
        AppError::Validation { errors: vec![FieldError::new(field, msg)] }
    }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::Internal { .. } => 500,
        }
    }

    /// JSON body returned to HTTP clients. Validation errors serialize as a
    /// per-field message map; ownership errors keep their plain message shape.
    pub fn body(&self) -> serde_json::Value {
        match self {
            AppError::Validation { errors } => {
                let mut map = serde_json::Map::new();
                for e in errors {
                    if let Some(arr) = map
                        .entry(e.field.clone())
                        .or_insert_with(|| json!([]))
                        .as_array_mut()
                    {
                        arr.push(json!(e.message));
                    }
                }
                json!({ "errors": map })
            }
            AppError::Auth { code, message } if code == "ownership" => {
                json!({ "message": message })
            }
            _ => json!({ "status": "error", "code": self.code_str(), "message": self.message() }),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}
