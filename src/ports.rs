//! Capability ports consumed by the conversation engine
//!
//! The engine only talks to speech output, audio capture, transcription,
//! news search and article fetching through these traits. Device and HTTP
//! implementations live in `voice`, `transcription`, `news` and `fetch`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::news::{Article, NewsQuery};

/// Voice parameters for a single utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechOptions {
    /// Speaking rate multiplier (1.0 = normal)
    pub rate: Option<f32>,
    /// Pitch multiplier (1.0 = normal)
    pub pitch: Option<f32>,
    /// Output volume in `0.0..=1.0`
    pub volume: Option<f32>,
}

impl SpeechOptions {
    /// Options for prompts and announcements
    #[must_use]
    pub const fn prompt() -> Self {
        Self {
            rate: None,
            pitch: None,
            volume: None,
        }
    }

    /// Options for reading article sentences
    #[must_use]
    pub const fn reading(rate: f32) -> Self {
        Self {
            rate: Some(rate),
            pitch: Some(1.0),
            volume: None,
        }
    }
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self::prompt()
    }
}

/// Terminal signal of a speech request
///
/// Success and failure both end the utterance; the error is detail only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechCompletion {
    /// Error reported by the speech engine, if any
    pub error: Option<String>,
}

impl SpeechCompletion {
    /// Utterance finished normally
    #[must_use]
    pub const fn done() -> Self {
        Self { error: None }
    }

    /// Utterance ended with an error
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }

    /// Whether the utterance finished without error
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Opaque handle to an in-progress recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordingHandle(Uuid);

impl RecordingHandle {
    /// Allocate a fresh handle
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Handle identifier
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordingHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Recorded audio ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: String,
}

impl RecordedAudio {
    /// Wrap WAV-encoded bytes
    #[must_use]
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/wav".to_string(),
        }
    }

    /// Whether no audio was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Text-to-speech capability
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, resolving once the utterance ends
    ///
    /// Always resolves exactly once, whether the speech succeeded or not.
    async fn speak(&self, text: &str, options: &SpeechOptions) -> SpeechCompletion;

    /// Interrupt the current utterance
    fn stop(&self);
}

/// Microphone capture capability
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Ask for microphone access; `false` means the session must not start
    async fn request_permission(&self) -> bool {
        true
    }

    /// Begin capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot start recording
    async fn start_recording(&self) -> Result<RecordingHandle>;

    /// Stop capturing and return the recording
    ///
    /// `None` signals a hardware or permission failure.
    async fn stop_recording(&self, handle: RecordingHandle) -> Option<RecordedAudio>;
}

/// Speech-to-text capability
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe recorded audio to text
    ///
    /// # Errors
    ///
    /// Returns error if the service fails or does not finish in time
    async fn transcribe(&self, audio: &RecordedAudio) -> Result<String>;
}

/// News search capability
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Find candidate articles; failures resolve to an empty list
    async fn search(&self, query: &NewsQuery) -> Vec<Article>;
}

/// Article HTML retrieval
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch the raw HTML of an article page
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be retrieved
    async fn fetch_html(&self, url: &str) -> Result<String>;
}
