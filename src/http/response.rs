//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Build text and JSON handler responses
//! - Map every error to a status code and a safe body
//!
//! # Design Decisions
//! - Client errors carry their message verbatim
//! - Server errors always render as "Internal Error"; details go to logs
//! - `ApiError::Fatal` is the only error that escalates past the request

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::routing::version::VersionError;
use crate::storage::StorageError;
use crate::tenancy::TenantError;

/// Body sent for every 5xx.
pub const INTERNAL_ERROR_BODY: &str = "Internal Error";

/// Result type of every endpoint handler.
pub type ApiResult = Result<ApiResponse, ApiError>;

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Text(String),
    Json(serde_json::Value),
}

/// A successful handler response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Body,
}

impl ApiResponse {
    /// 200 with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Body::Text(body.into()),
        }
    }

    /// 200 with a JSON body.
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Body::Json(body),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            Body::Text(text) => (self.status, text).into_response(),
            Body::Json(value) => (self.status, Json(value)).into_response(),
        }
    }
}

/// Every way a request can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Method not supported")]
    MethodNotAllowed,

    #[error(transparent)]
    Version(#[from] VersionError),

    /// Client input problem; the message is sent as the body.
    #[error("{0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Internal(String),

    /// Unrecoverable internal condition: answer 500, then stop the process.
    #[error("{0}")]
    Fatal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        ApiError::Fatal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Version(_) | ApiError::BadRequest(_) | ApiError::Tenant(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Storage(_) | ApiError::Internal(_) | ApiError::Fatal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Fatal(_))
    }

    /// Body sent to the client.
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            INTERNAL_ERROR_BODY.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
