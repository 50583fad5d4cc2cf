//! Error responses for the HTTP API.
//!
//! Every failure is rendered as JSON:
//!
//! ```json
//! { "error": "out_of_range", "message": "...", "retryable": false }
//! ```
//!
//! `retryable` tells the client whether repeating the same request may
//! succeed (lock contention, cancellation, a failing store).

use crate::server::telemetry::increment_errors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ordinal::Error;
use serde::Serialize;

/// An error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    retryable: bool,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
    retryable: bool,
}

impl ApiError {
    /// The request body could not be decoded.
    pub fn invalid_body(reason: impl core::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_body",
            message: format!("invalid request body: {reason}"),
            retryable: false,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound { .. } | Error::ReservationNotFound { .. } => StatusCode::NOT_FOUND,
            Error::AlreadyExists { .. } => StatusCode::CONFLICT,
            Error::InvalidConfig { .. } | Error::InvalidName { .. } => StatusCode::BAD_REQUEST,
            Error::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::StoreFailure(_) | Error::LockTimeout { .. } | Error::Cancelled { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        #[cfg(feature = "tracing")]
        {
            if status.is_server_error() {
                tracing::warn!(kind = err.kind(), "Request failed: {}", err);
            }
        }

        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        increment_errors(self.kind);
        let body = ErrorBody {
            error: self.kind,
            message: &self.message,
            retryable: self.retryable,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use ordinal::StoreError;

    #[test]
    fn maps_engine_errors_to_status_codes() {
        let cases = [
            (Error::NotFound { name: "a".into() }, StatusCode::NOT_FOUND),
            (
                Error::ReservationNotFound {
                    name: "a".into(),
                    index: 1,
                },
                StatusCode::NOT_FOUND,
            ),
            (Error::AlreadyExists { name: "a".into() }, StatusCode::CONFLICT),
            (
                Error::InvalidConfig {
                    reason: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::InvalidName {
                    name: "".into(),
                    reason: "must not be empty",
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::OutOfRange {
                    name: "a".into(),
                    last: 3,
                    max_index: 3,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::StoreFailure(StoreError::Backend("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::LockTimeout {
                    name: "a".into(),
                    waited: Duration::from_secs(5),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (Error::Cancelled { name: "a".into() }, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, expected) in cases {
            let kind = err.kind();
            let api = ApiError::from(err);
            assert_eq!(api.status, expected, "{kind}");
        }
    }

    #[test]
    fn retryable_flag_follows_engine() {
        let api = ApiError::from(Error::LockTimeout {
            name: "a".into(),
            waited: Duration::from_millis(10),
        });
        assert!(api.retryable);
        let api = ApiError::from(Error::NotFound { name: "a".into() });
        assert!(!api.retryable);
    }
}
