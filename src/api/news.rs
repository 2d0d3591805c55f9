//! Headline search proxy

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{ApiState, ProxyError};

/// Query accepted by `GET /news`
#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    /// Outlet slug
    pub source: Option<String>,
    /// Topic keywords
    pub q: Option<String>,
}

/// Build news router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/news", get(search))
        .with_state(state)
}

/// Upstream query parameters, without the key
///
/// Blank values are omitted; with neither an outlet nor a topic the search
/// falls back to US top headlines.
#[must_use]
pub fn upstream_params(params: &NewsParams) -> Vec<(&'static str, String)> {
    let source = params.source.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let topic = params.q.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let mut query = vec![("language", "en".to_string())];
    if let Some(source) = source {
        query.push(("sources", source.to_string()));
    }
    if let Some(topic) = topic {
        query.push(("q", topic.to_string()));
    }
    if source.is_none() && topic.is_none() {
        query.push(("country", "us".to_string()));
    }
    query
}

async fn search(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<NewsParams>,
) -> Result<Json<serde_json::Value>, ProxyError> {
    let key = state
        .news_api_key
        .as_ref()
        .ok_or(ProxyError::NotConfigured("News search not configured"))?;

    let query = upstream_params(&params);
    tracing::debug!(?query, "forwarding news search");

    let response = state
        .client
        .get(&state.news_upstream)
        .query(&query)
        .query(&[("apiKey", key.expose_secret())])
        .send()
        .await
        .and_then(reqwest::Response::error_for_status);

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "error fetching news");
            return Err(ProxyError::Upstream("Failed to fetch news"));
        }
    };

    match response.json::<serde_json::Value>().await {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            tracing::error!(error = %e, "news response was not JSON");
            Err(ProxyError::Upstream("Failed to fetch news"))
        }
    }
}
