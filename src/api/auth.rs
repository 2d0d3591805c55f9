//! Access token check for the transcription routes

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use super::{ApiState, ProxyError};

/// Token from the `authorization` header, with or without a `Bearer` prefix
fn extract_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
}

/// Reject requests without the configured access token
pub async fn require_access_token(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    let Some(expected) = &state.access_token else {
        return Ok(next.run(req).await);
    };

    match extract_token(&req) {
        Some(token) if token == expected.expose_secret() => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "invalid access token");
            Err(ProxyError::Unauthorized)
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "no access token provided");
            Err(ProxyError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_extract_token() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_token(&req), None);

        req.headers_mut()
            .insert("authorization", HeaderValue::from_static("Bearer secret-1"));
        assert_eq!(extract_token(&req), Some("secret-1"));

        req.headers_mut()
            .insert("authorization", HeaderValue::from_static("secret-2"));
        assert_eq!(extract_token(&req), Some("secret-2"));
    }
}
