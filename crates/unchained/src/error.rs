//! HTTP-facing errors and their status code mapping.
//!
//! Validation failures answer with a field → messages map; every other error
//! answers with `{"detail": "..."}`. Server-side faults are logged and their
//! detail withheld from the client.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use itertools::Itertools;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use unchained_core::{SerializerError, ValidationErrors};
use unchained_db::RepositoryError;

use crate::authentication::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// `challenge` becomes the `WWW-Authenticate` header.
    #[error("not authenticated: {detail}")]
    NotAuthenticated {
        detail: String,
        challenge: Option<String>,
    },

    #[error("permission denied")]
    PermissionDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method {method} not allowed")]
    MethodNotAllowed { method: Method, allow: Vec<Method> },

    #[error("{0}")]
    NotAcceptable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => Value::Object(errors.to_map()),
            Self::Internal(detail) => {
                error!(%detail, "internal error");
                json!({"detail": "internal server error"})
            }
            Self::NotAuthenticated { detail, .. } => json!({ "detail": detail }),
            other => json!({ "detail": other.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        let headers = response.headers_mut();
        match &self {
            Self::NotAuthenticated {
                challenge: Some(challenge),
                ..
            } => {
                if let Ok(value) = HeaderValue::from_str(challenge) {
                    headers.insert(header::WWW_AUTHENTICATE, value);
                }
            }
            Self::MethodNotAllowed { allow, .. } => {
                if let Ok(value) = HeaderValue::from_str(&allow.iter().join(", ")) {
                    headers.insert(header::ALLOW, value);
                }
            }
            _ => {}
        }
        response
    }
}

impl From<SerializerError> for ApiError {
    fn from(error: SerializerError) -> Self {
        match error {
            SerializerError::Validation(errors) | SerializerError::Modifier { errors, .. } => {
                Self::Validation(errors)
            }
            SerializerError::Decode { .. } | SerializerError::InvalidPayload { .. } => {
                Self::BadRequest(error.to_string())
            }
            SerializerError::Config(_) | SerializerError::Encode { .. } => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            RepositoryError::Conflict(what) => Self::Conflict(what),
            RepositoryError::InvalidInput(_) | RepositoryError::Specification(_) => {
                Self::BadRequest(error.to_string())
            }
            RepositoryError::Cancelled | RepositoryError::DeadlineExceeded => {
                Self::Unavailable(error.to_string())
            }
            RepositoryError::Database(_) => Self::Internal(error.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::CouldNotAuthenticate(failure) => Self::NotAuthenticated {
                detail: failure.to_string(),
                challenge: None,
            },
            AuthError::Fault(detail) => Self::Internal(detail),
        }
    }
}
