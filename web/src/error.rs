use std::error::Error as StdError;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;

pub type Result<T> = core::result::Result<T, Error>;

/// Error returned by route handlers. The `error_kind` decides the HTTP status
/// and `source` keeps the underlying cause for logging.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// No trusted user identity accompanied the request.
    Unauthenticated,
    /// The request body is missing required fields or is not valid JSON.
    InvalidRequest(String),
    /// Anything else that went wrong while handling the request.
    Internal(String),
}

impl Error {
    pub fn unauthenticated() -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::Unauthenticated,
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::InvalidRequest(reason.into()),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::Internal(reason.into()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            WebErrorKind::InvalidRequest(reason) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
            }
            WebErrorKind::Internal(reason) => {
                error!("Internal error while handling request: {reason} (source: {:?})", self.source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(err: JsonRejection) -> Self {
        Error {
            error_kind: WebErrorKind::InvalidRequest(err.body_text()),
            source: Some(Box::new(err)),
        }
    }
}

/// Turns a panic inside a handler into a 500 with the usual error body.
/// Installed through `tower_http::catch_panic::CatchPanicLayer::custom`.
pub(crate) fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    Error::internal(format!("handler panicked: {detail}")).into_response()
}
