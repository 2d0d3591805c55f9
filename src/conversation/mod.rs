//! Turn-taking conversation engine
//!
//! Asks the topic and outlet questions, searches for articles, lets the user
//! pick one by voice, reads it aloud and asks whether to continue. Devices and
//! remote services are reached only through the [`ports`](crate::ports)
//! traits, so the whole flow runs against in-memory fakes in tests.

mod engine;
pub mod intent;
pub mod prompts;
pub mod reading;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::news::Article;
use crate::ports::{ArticleSource, AudioInput, NewsSource, SpeechOutput, Transcriber};

pub use self::engine::{ConversationEngine, SessionOutcome};
pub use self::state::{
    Activity, Answer, Answers, ConversationState, ExclusiveFlags, PAGE_SIZE, Phase, QUESTIONS,
    QuestionKey,
};

/// Capabilities the engine drives
#[derive(Clone)]
pub struct Ports {
    pub speech: Arc<dyn SpeechOutput>,
    pub microphone: Arc<dyn AudioInput>,
    pub transcriber: Arc<dyn Transcriber>,
    pub news: Arc<dyn NewsSource>,
    pub articles: Arc<dyn ArticleSource>,
}

impl std::fmt::Debug for Ports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}

/// Delays, windows and limits for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTimings {
    /// Pause between a spoken prompt and recording
    pub settle_delay: Duration,
    /// Fixed capture window for every reply
    pub listen_window: Duration,
    /// Pause after an out-of-range or failed turn before listening again
    pub retry_delay: Duration,
    /// Pause before a reset after "no articles" or a farewell
    pub reset_delay: Duration,
    /// Deadline for a transcription result per listen
    pub watchdog: Duration,
    /// Shorter deadline for both continuation listens
    pub continuation_timeout: Duration,
    /// Pause after a sentence ending in `.`, `!` or `?`
    pub sentence_pause: Duration,
    /// Pause after a sentence ending in `,`, `;` or `:`
    pub clause_pause: Duration,
    /// Pause after anything else
    pub phrase_pause: Duration,
    /// Speaking rate while reading articles
    pub reading_rate: f32,
    /// Consecutive failed or unrecognized turns tolerated before a reset
    pub max_reprompts: u32,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            listen_window: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            reset_delay: Duration::from_secs(2),
            watchdog: Duration::from_secs(30),
            continuation_timeout: Duration::from_secs(10),
            sentence_pause: Duration::from_millis(800),
            clause_pause: Duration::from_millis(400),
            phrase_pause: Duration::from_millis(300),
            reading_rate: 0.85,
            max_reprompts: 3,
        }
    }
}

impl SessionTimings {
    /// Every delay set to `delay`; used to run sessions quickly
    #[must_use]
    pub fn uniform(delay: Duration) -> Self {
        Self {
            settle_delay: delay,
            listen_window: delay,
            retry_delay: delay,
            reset_delay: delay,
            watchdog: delay * 1000,
            continuation_timeout: delay * 500,
            sentence_pause: delay,
            clause_pause: delay,
            phrase_pause: delay,
            ..Self::default()
        }
    }
}

/// Why a session started over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// The search returned nothing
    NoArticles,
    /// The user asked for another article
    Continue,
    /// The user declined another article
    Farewell,
    /// The continuation reply stayed unclear
    Unresolved,
    /// Too many failed or unrecognized turns
    TooManyReprompts,
    /// [`SessionControl::reset`] was called
    Requested,
}

/// Observable change in a running session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SessionEvent {
    PhaseChanged { phase: Phase },
    FlagsChanged { active: Option<Activity> },
    Spoke { text: String },
    Heard { transcript: String },
    AnswerRecorded { key: QuestionKey, answer: Answer },
    ArticlesFound { count: usize },
    PageAnnounced { page_index: usize, titles: Vec<String> },
    ArticleSelected { article: Article },
    ReadingProgress { sentence: usize, total: usize },
    SessionReset { reason: ResetReason },
}

#[derive(Debug, Default)]
struct Signals {
    stop_reading: AtomicBool,
    shutdown: AtomicBool,
    reset: AtomicBool,
}

/// Handle for interrupting a running session from another task
#[derive(Clone)]
pub struct SessionControl {
    signals: Arc<Signals>,
    speech: Arc<dyn SpeechOutput>,
}

impl SessionControl {
    fn new(speech: Arc<dyn SpeechOutput>) -> Self {
        Self {
            signals: Arc::default(),
            speech,
        }
    }

    /// Stop reading at the next sentence boundary and end the session
    pub fn stop_reading(&self) {
        self.signals.stop_reading.store(true, Ordering::SeqCst);
        self.speech.stop();
    }

    /// End the session at the next transition
    pub fn shutdown(&self) {
        self.signals.shutdown.store(true, Ordering::SeqCst);
        self.speech.stop();
    }

    /// Start over from the first question at the next transition
    pub fn reset(&self) {
        self.signals.reset.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested during reading
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.signals.stop_reading.load(Ordering::SeqCst)
    }

    /// Whether a shutdown was requested
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.signals.shutdown.load(Ordering::SeqCst)
    }

    fn clear_stop(&self) {
        self.signals.stop_reading.store(false, Ordering::SeqCst);
    }

    fn take_reset(&self) -> bool {
        self.signals.reset.swap(false, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SessionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionControl")
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}
