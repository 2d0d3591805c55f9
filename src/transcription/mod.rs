//! Remote transcription client
//!
//! Uploads recorded audio, creates a transcript job, and polls it until a
//! terminal status. Talks to the backend proxy (or any service speaking the
//! same `/upload` + `/transcript` protocol).

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::TranscriptionConfig;
use crate::ports::{RecordedAudio, Transcriber};
use crate::{Error, Result};

/// Trailing sentence punctuation, including CJK full-width forms
static TRAILING_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.。！？!?]+$").expect("valid regex"));

/// Strip trailing sentence punctuation and surrounding whitespace
#[must_use]
pub fn normalize_transcript_text(text: &str) -> String {
    TRAILING_PUNCTUATION
        .replace(text.trim(), "")
        .trim()
        .to_string()
}

/// Status of a transcript job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl TranscriptStatus {
    /// Whether polling can stop
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// `POST /upload` response
#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

/// `POST /transcript` request
#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

/// Transcript job as reported by `/transcript` endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptJob {
    /// Job identifier
    pub id: String,
    /// Current status
    pub status: TranscriptStatus,
    /// Recognized text once completed
    #[serde(default)]
    pub text: Option<String>,
    /// Provider error message when failed
    #[serde(default)]
    pub error: Option<String>,
}

/// Polling cadence for transcript jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status poll
    pub interval: Duration,
    /// Polls made before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 90,
        }
    }
}

/// Client for the upload-and-poll transcription protocol
pub struct TranscriptionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    poll: PollPolicy,
}

impl TranscriptionClient {
    /// Create a client from configuration
    #[must_use]
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll: PollPolicy {
                interval: config.poll_interval,
                max_attempts: config.max_polls,
            },
        }
    }

    /// Create a client against `base_url` with default polling
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            poll: PollPolicy::default(),
        }
    }

    /// Override the polling cadence
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("authorization", key.expose_secret()),
            None => request,
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Transcription(format!("{what} failed with {status}: {body}")))
    }

    /// Upload audio bytes, returning the provider's URL for them
    ///
    /// # Errors
    ///
    /// Returns error if the upload request fails
    pub async fn upload(&self, audio: &RecordedAudio) -> Result<String> {
        let request = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("content-type", &audio.mime_type)
            .body(audio.bytes.clone());

        let response = self.authorized(request).send().await?;
        let body: UploadResponse = Self::check(response, "upload").await?.json().await?;

        tracing::debug!(bytes = audio.bytes.len(), "audio uploaded");
        Ok(body.upload_url)
    }

    /// Create a transcript job for previously uploaded audio
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn create_transcript(&self, audio_url: &str) -> Result<TranscriptJob> {
        let request = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .json(&TranscriptRequest { audio_url });

        let response = self.authorized(request).send().await?;
        let job: TranscriptJob = Self::check(response, "transcript creation")
            .await?
            .json()
            .await?;

        tracing::debug!(id = %job.id, status = ?job.status, "transcript job created");
        Ok(job)
    }

    /// Fetch the current state of a transcript job
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn poll_transcript(&self, id: &str) -> Result<TranscriptJob> {
        let request = self.client.get(format!("{}/transcript/{id}", self.base_url));
        let response = self.authorized(request).send().await?;
        Ok(Self::check(response, "transcript poll").await?.json().await?)
    }

    /// Upload, create a job and poll until it finishes
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` when the provider reports an error and
    /// `Error::TranscriptionTimeout` when polling is exhausted
    pub async fn transcribe_audio(&self, audio: &RecordedAudio) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::Recording("no audio captured".to_string()));
        }

        let audio_url = self.upload(audio).await?;
        let job = self.create_transcript(&audio_url).await?;

        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;

            let job = self.poll_transcript(&job.id).await?;
            match job.status {
                TranscriptStatus::Completed => {
                    let text = normalize_transcript_text(job.text.as_deref().unwrap_or_default());
                    tracing::info!(attempt, chars = text.len(), "transcription complete");
                    return Ok(text);
                }
                TranscriptStatus::Error => {
                    let message = job
                        .error
                        .unwrap_or_else(|| "unknown transcription error".to_string());
                    tracing::warn!(id = %job.id, error = %message, "transcription failed");
                    return Err(Error::Transcription(message));
                }
                status => tracing::trace!(attempt, ?status, "transcript pending"),
            }
        }

        Err(Error::TranscriptionTimeout {
            attempts: self.poll.max_attempts,
        })
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio: &RecordedAudio) -> Result<String> {
        self.transcribe_audio(audio).await
    }
}

impl std::fmt::Debug for TranscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionClient")
            .field("base_url", &self.base_url)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_punctuation() {
        assert_eq!(normalize_transcript_text("Climate change."), "Climate change");
        assert_eq!(normalize_transcript_text("  Really?!  "), "Really");
        assert_eq!(normalize_transcript_text("はい。"), "はい");
        assert_eq!(normalize_transcript_text("U.S. politics"), "U.S. politics");
        assert_eq!(normalize_transcript_text("..."), "");
    }

    #[test]
    fn test_status_parsing() {
        let job: TranscriptJob =
            serde_json::from_str(r#"{"id": "t1", "status": "completed", "text": "Hi."}"#).unwrap();
        assert_eq!(job.status, TranscriptStatus::Completed);
        assert!(job.status.is_terminal());

        let job: TranscriptJob =
            serde_json::from_str(r#"{"id": "t2", "status": "rescheduled"}"#).unwrap();
        assert_eq!(job.status, TranscriptStatus::Unknown);
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = TranscriptionClient::with_base_url("http://localhost:1/");
        assert_eq!(client.base_url, "http://localhost:1");
    }
}
