//! Transcription proxy: upload, create job, poll job

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{ApiState, ProxyError};

/// `POST /upload` response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub upload_url: String,
}

/// `POST /transcript` request
#[derive(Debug, Deserialize)]
pub struct CreateTranscriptRequest {
    #[serde(default)]
    pub audio_url: String,
}

#[derive(Debug, Serialize)]
struct UpstreamTranscriptRequest<'a> {
    audio_url: &'a str,
    punctuate: bool,
    format_text: bool,
}

/// Transcript job state returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    #[serde(default)]
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build transcription router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/transcript", post(create_transcript))
        .route("/transcript/{id}", get(get_transcript))
        .with_state(state)
}

fn provider_key(state: &ApiState) -> Result<&str, ProxyError> {
    state
        .transcription_api_key
        .as_ref()
        .map(|key| key.expose_secret())
        .ok_or(ProxyError::NotConfigured("Transcription not configured"))
}

async fn read_upstream<T: DeserializeOwned>(
    response: reqwest::Result<reqwest::Response>,
    what: &'static str,
) -> Result<T, ProxyError> {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, what, "transcription upstream unreachable");
            return Err(ProxyError::Upstream(what));
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, body = %body, what, "transcription upstream failed");
        return Err(ProxyError::Upstream(what));
    }

    response.json::<T>().await.map_err(|e| {
        tracing::error!(error = %e, what, "unexpected transcription response");
        ProxyError::Upstream(what)
    })
}

async fn upload(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ProxyError> {
    let key = provider_key(&state)?;
    if body.is_empty() {
        return Err(ProxyError::BadRequest("Audio data is required"));
    }

    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    tracing::debug!(bytes = body.len(), content_type, "forwarding audio upload");

    let response = state
        .client
        .post(format!("{}/upload", state.transcription_upstream))
        .header("authorization", key)
        .header("content-type", content_type)
        .body(body)
        .send()
        .await;

    read_upstream(response, "Failed to upload audio").await.map(Json)
}

async fn create_transcript(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreateTranscriptRequest>,
) -> Result<Json<TranscriptResponse>, ProxyError> {
    let key = provider_key(&state)?;
    if request.audio_url.trim().is_empty() {
        return Err(ProxyError::BadRequest("Audio URL is required"));
    }

    let response = state
        .client
        .post(format!("{}/transcript", state.transcription_upstream))
        .header("authorization", key)
        .json(&UpstreamTranscriptRequest {
            audio_url: &request.audio_url,
            punctuate: true,
            format_text: true,
        })
        .send()
        .await;

    let job: TranscriptResponse = read_upstream(response, "Failed to start transcription").await?;
    tracing::debug!(id = %job.id, status = %job.status, "transcription started");

    // only id and status are meaningful at creation
    Ok(Json(TranscriptResponse {
        id: job.id,
        status: job.status,
        text: None,
        error: None,
    }))
}

async fn get_transcript(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, ProxyError> {
    let key = provider_key(&state)?;

    let response = state
        .client
        .get(format!("{}/transcript/{id}", state.transcription_upstream))
        .header("authorization", key)
        .send()
        .await;

    let mut job: TranscriptResponse =
        read_upstream(response, "Failed to get transcription status").await?;
    if job.id.is_empty() {
        job.id = id;
    }
    Ok(Json(job))
}
