//! JSON error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Proxy handler errors
#[derive(Debug)]
pub enum ProxyError {
    /// Provider key is not configured
    NotConfigured(&'static str),
    /// Request is malformed
    BadRequest(&'static str),
    /// Access token missing or wrong
    Unauthorized,
    /// Upstream call failed; the message is returned to the client
    Upstream(&'static str),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Authorization required"),
            Self::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_failed", msg),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: message.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
