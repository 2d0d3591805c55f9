//! The conversation state machine

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::extract::ContentExtractor;
use crate::news::NewsQuery;
use crate::ports::{SpeechCompletion, SpeechOptions};
use crate::{Error, Result};

use super::intent::{self, Continuation, SelectionReply};
use super::state::{Activity, Answer, ConversationState, Phase, QuestionKey};
use super::{Ports, ResetReason, SessionControl, SessionEvent, SessionTimings, prompts, reading};

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 256;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user stopped the reading
    Stopped,
    /// [`SessionControl::shutdown`] was called
    Shutdown,
}

/// Result of one record-and-transcribe turn
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenOutcome {
    /// A transcript arrived in time
    Heard(String),
    /// Another exclusive activity was active
    Refused,
    /// Recording or transcription failed
    Failed,
    /// The watchdog expired before a transcript arrived
    TimedOut,
}

/// Per-cycle bookkeeping that is not part of the observable state
#[derive(Debug, Default)]
struct TurnTracker {
    /// Consecutive failed or unrecognized turns
    reprompts: u32,
    /// Speak the page titles before the next selection listen
    announce_page: bool,
    /// Unclear continuation replies so far
    continuation_retries: u32,
}

/// Drives one voice session over the capability ports
pub struct ConversationEngine {
    id: Uuid,
    ports: Ports,
    timings: SessionTimings,
    extractor: ContentExtractor,
    state: ConversationState,
    turn: TurnTracker,
    control: SessionControl,
    events: broadcast::Sender<SessionEvent>,
}

impl ConversationEngine {
    /// Create an engine at the first question
    #[must_use]
    pub fn new(ports: Ports, timings: SessionTimings) -> Self {
        let control = SessionControl::new(Arc::clone(&ports.speech));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            id: Uuid::new_v4(),
            ports,
            timings,
            extractor: ContentExtractor::default(),
            state: ConversationState::new(),
            turn: TurnTracker::default(),
            control,
            events,
        }
    }

    /// Use a custom content extractor
    #[must_use]
    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Session identifier, used in logs
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Handle for stopping, resetting or shutting down from elsewhere
    #[must_use]
    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Run the session until it goes idle
    ///
    /// # Errors
    ///
    /// Returns `Error::PermissionDenied` if microphone access is refused
    pub async fn run(&mut self) -> Result<SessionOutcome> {
        if !self.ports.microphone.request_permission().await {
            tracing::error!(session = %self.id, "microphone permission denied");
            return Err(Error::PermissionDenied(
                "microphone access is required to answer questions".to_string(),
            ));
        }

        tracing::info!(session = %self.id, "session started");
        while self.state.phase != Phase::Idle {
            self.step().await;
        }

        let outcome = if self.control.is_shutdown_requested() {
            SessionOutcome::Shutdown
        } else {
            SessionOutcome::Stopped
        };
        tracing::info!(session = %self.id, ?outcome, "session ended");
        Ok(outcome)
    }

    /// Perform exactly one transition and return the resulting phase
    pub async fn step(&mut self) -> Phase {
        if self.control.is_shutdown_requested() {
            self.set_phase(Phase::Idle);
            return Phase::Idle;
        }
        if self.control.take_reset() {
            self.reset(ResetReason::Requested);
            return self.state.phase;
        }

        match self.state.phase {
            Phase::AskingQuestion if self.state.ready_to_fetch => self.fetch_articles().await,
            Phase::AskingQuestion => self.ask_question().await,
            Phase::SelectingArticle => self.select_article().await,
            Phase::ReadingArticle => self.read_article().await,
            Phase::AwaitingContinuation => self.await_continuation().await,
            Phase::Recording | Phase::Transcribing => {
                tracing::warn!(phase = %self.state.phase, "step called mid-listen, starting over");
                self.reset(ResetReason::Unresolved);
            }
            Phase::Idle => {}
        }

        self.state.phase
    }

    async fn ask_question(&mut self) {
        let Some(key) = self.state.current_question() else {
            self.state.ready_to_fetch = true;
            return;
        };

        self.say(key.prompt(), SpeechOptions::prompt()).await;
        tokio::time::sleep(self.timings.settle_delay).await;

        let transcript = match self.listen(self.timings.watchdog).await {
            ListenOutcome::Heard(transcript) if !intent::normalize_transcript(&transcript).is_empty() => {
                transcript
            }
            outcome => {
                tracing::debug!(question = %key, ?outcome, "no usable answer");
                self.reprompt(prompts::DID_NOT_CATCH).await;
                return;
            }
        };

        let answer = if intent::is_skip(&intent::normalize_transcript(&transcript)) {
            self.say(key.skip_acknowledgement(), SpeechOptions::prompt()).await;
            Answer::Skipped
        } else {
            let text = transcript.trim().to_string();
            self.say(&prompts::you_said(&text), SpeechOptions::prompt()).await;
            Answer::Given(text)
        };

        tracing::info!(question = %key, ?answer, "answer recorded");
        self.emit(SessionEvent::AnswerRecorded {
            key,
            answer: answer.clone(),
        });
        self.turn.reprompts = 0;
        self.state.record_answer(answer);
    }

    async fn fetch_articles(&mut self) {
        self.state.ready_to_fetch = false;

        let answers = &self.state.answers;
        let query = NewsQuery::new(
            answers.value(QuestionKey::Topic),
            answers.value(QuestionKey::Outlet),
        );
        tracing::info!(topic = ?query.topic, outlet = ?query.outlet, "searching for articles");

        let articles = self.ports.news.search(&query).await;
        if articles.is_empty() {
            self.say(prompts::NO_ARTICLES, SpeechOptions::prompt()).await;
            tokio::time::sleep(self.timings.reset_delay).await;
            self.reset(ResetReason::NoArticles);
            return;
        }

        self.emit(SessionEvent::ArticlesFound {
            count: articles.len(),
        });
        self.state.set_candidates(articles);
        self.turn.announce_page = true;
        self.turn.reprompts = 0;
        self.set_phase(Phase::SelectingArticle);
    }

    async fn select_article(&mut self) {
        let page_len = self.state.current_page().len();
        let has_next = self.state.has_next_page();

        if std::mem::take(&mut self.turn.announce_page) {
            let page = self.state.current_page();
            let announcement = prompts::page_announcement(page, has_next);
            self.emit(SessionEvent::PageAnnounced {
                page_index: self.state.page_index,
                titles: page.iter().map(|a| a.title.clone()).collect(),
            });
            self.say(&announcement, SpeechOptions::prompt()).await;
        }

        tokio::time::sleep(self.timings.settle_delay).await;

        let transcript = match self.listen(self.timings.watchdog).await {
            ListenOutcome::Heard(transcript) => transcript,
            outcome => {
                tracing::debug!(?outcome, "no usable selection");
                let message = format!(
                    "{} {}",
                    prompts::DID_NOT_CATCH,
                    prompts::selection_prompt(page_len, has_next)
                );
                self.reprompt(&message).await;
                return;
            }
        };

        match intent::parse_selection(&intent::normalize_transcript(&transcript)) {
            SelectionReply::More if self.state.next_page() => {
                tracing::debug!(page = self.state.page_index, "next page");
                self.turn.announce_page = true;
                self.turn.reprompts = 0;
            }
            SelectionReply::More => {
                self.say(prompts::NO_MORE_ARTICLES, SpeechOptions::prompt()).await;
                tokio::time::sleep(self.timings.retry_delay).await;
            }
            SelectionReply::Choice(choice) if self.state.select(choice).is_some() => {
                if let Some(article) = self.state.selected_article.clone() {
                    tracing::info!(choice, title = %article.title, "article selected");
                    self.emit(SessionEvent::ArticleSelected { article });
                }
                self.turn.reprompts = 0;
                self.set_phase(Phase::ReadingArticle);
            }
            reply => {
                tracing::debug!(?reply, page_len, "selection not understood");
                self.reprompt(&prompts::selection_clarification(page_len, has_next))
                    .await;
            }
        }
    }

    async fn read_article(&mut self) {
        let Some(article) = self.state.selected_article.clone() else {
            self.back_to_selection();
            return;
        };

        self.control.clear_stop();

        let document = match self.ports.articles.fetch_html(&article.url).await {
            Ok(html) => self.extractor.extract(&html),
            Err(e) => Err(e),
        };

        let sentences = match document {
            Ok(document) => document.sentences,
            Err(e) => {
                tracing::warn!(url = %article.url, error = %e, "article could not be read");
                let message = if matches!(e, Error::Extraction(_)) {
                    prompts::EXTRACTION_FAILED
                } else {
                    prompts::ARTICLE_ERROR
                };
                self.say(message, SpeechOptions::prompt()).await;
                self.back_to_selection();
                return;
            }
        };

        let total = sentences.len();
        let options = SpeechOptions::reading(self.timings.reading_rate);
        tracing::info!(title = %article.title, sentences = total, "reading article");

        for (index, sentence) in sentences.iter().enumerate() {
            if self.control.is_stop_requested() {
                break;
            }
            self.say(sentence, options).await;
            self.emit(SessionEvent::ReadingProgress {
                sentence: index + 1,
                total,
            });
            if self.control.is_stop_requested() {
                break;
            }
            tokio::time::sleep(reading::pause_after(sentence, &self.timings)).await;
        }

        self.state.selected_article = None;

        if self.control.is_stop_requested() {
            tracing::info!(title = %article.title, "reading stopped by user");
            self.set_phase(Phase::Idle);
            return;
        }

        self.say(prompts::READING_COMPLETE, SpeechOptions::prompt()).await;
        self.say(prompts::CONTINUE_PROMPT, SpeechOptions::prompt()).await;
        self.turn.continuation_retries = 0;
        self.set_phase(Phase::AwaitingContinuation);
    }

    async fn await_continuation(&mut self) {
        tokio::time::sleep(self.timings.settle_delay).await;

        let reply = match self.listen(self.timings.continuation_timeout).await {
            ListenOutcome::Heard(transcript) => {
                intent::classify_continuation(&intent::normalize_transcript(&transcript))
            }
            outcome => {
                tracing::debug!(?outcome, "no continuation reply");
                Continuation::Unclear
            }
        };

        match reply {
            Continuation::Positive => self.reset(ResetReason::Continue),
            Continuation::Negative => {
                self.say(prompts::FAREWELL, SpeechOptions::prompt()).await;
                tokio::time::sleep(self.timings.reset_delay).await;
                self.reset(ResetReason::Farewell);
            }
            Continuation::Unclear if self.turn.continuation_retries == 0 => {
                self.turn.continuation_retries += 1;
                self.say(prompts::CONTINUE_CLARIFICATION, SpeechOptions::prompt())
                    .await;
            }
            Continuation::Unclear => {
                tracing::info!("continuation still unclear, starting over");
                self.reset(ResetReason::Unresolved);
            }
        }
    }

    /// Record for the listen window, then transcribe under `watchdog`
    ///
    /// The phase shows `Recording` then `Transcribing` and is restored
    /// afterwards. Flags are released on every path.
    async fn listen(&mut self, watchdog: Duration) -> ListenOutcome {
        let resume = self.state.phase;

        if !self.acquire(Activity::Recording) {
            tracing::debug!(active = ?self.state.flags.active(), "recording refused");
            return ListenOutcome::Refused;
        }
        self.set_phase(Phase::Recording);

        let microphone = Arc::clone(&self.ports.microphone);
        let handle = match microphone.start_recording().await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "failed to start recording");
                self.release(Activity::Recording);
                self.set_phase(resume);
                return ListenOutcome::Failed;
            }
        };

        tokio::time::sleep(self.timings.listen_window).await;
        let audio = microphone.stop_recording(handle).await;
        self.release(Activity::Recording);

        let Some(audio) = audio.filter(|a| !a.is_empty()) else {
            tracing::warn!("recording produced no audio");
            self.set_phase(resume);
            return ListenOutcome::Failed;
        };

        self.acquire(Activity::Processing);
        self.set_phase(Phase::Transcribing);

        let transcriber = Arc::clone(&self.ports.transcriber);
        let result = tokio::time::timeout(watchdog, transcriber.transcribe(&audio)).await;

        self.release(Activity::Processing);
        self.set_phase(resume);

        match result {
            Ok(Ok(transcript)) => {
                tracing::debug!(%transcript, "heard");
                self.emit(SessionEvent::Heard {
                    transcript: transcript.clone(),
                });
                ListenOutcome::Heard(transcript)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "transcription failed");
                ListenOutcome::Failed
            }
            Err(_) => {
                tracing::warn!(watchdog_ms = watchdog.as_millis(), "transcription watchdog expired");
                ListenOutcome::TimedOut
            }
        }
    }

    /// Speak while holding the speaking flag
    async fn say(&mut self, text: &str, options: SpeechOptions) -> SpeechCompletion {
        if !self.acquire(Activity::Speaking) {
            tracing::warn!(active = ?self.state.flags.active(), "speech refused");
            return SpeechCompletion::failed("another activity is in progress");
        }

        self.emit(SessionEvent::Spoke {
            text: text.to_string(),
        });
        let completion = self.ports.speech.speak(text, &options).await;
        self.release(Activity::Speaking);

        if let Some(error) = &completion.error {
            tracing::warn!(%error, "speech ended with error");
        }
        completion
    }

    /// Count a failed turn and re-prompt, or start over past the limit
    async fn reprompt(&mut self, message: &str) {
        self.turn.reprompts += 1;
        if self.turn.reprompts > self.timings.max_reprompts {
            tracing::warn!(reprompts = self.turn.reprompts, "too many unresolved turns");
            self.say(prompts::STARTING_OVER, SpeechOptions::prompt()).await;
            self.reset(ResetReason::TooManyReprompts);
            return;
        }

        self.say(message, SpeechOptions::prompt()).await;
        tokio::time::sleep(self.timings.retry_delay).await;
    }

    fn back_to_selection(&mut self) {
        self.state.selected_article = None;
        self.turn.announce_page = true;
        self.set_phase(Phase::SelectingArticle);
    }

    fn reset(&mut self, reason: ResetReason) {
        tracing::info!(session = %self.id, ?reason, "session reset");
        self.state = ConversationState::new();
        self.turn = TurnTracker::default();
        self.control.clear_stop();
        self.emit(SessionEvent::SessionReset { reason });
        self.emit(SessionEvent::PhaseChanged {
            phase: self.state.phase,
        });
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            tracing::debug!(from = %self.state.phase, to = %phase, "phase change");
            self.state.phase = phase;
            self.emit(SessionEvent::PhaseChanged { phase });
        }
    }

    fn acquire(&mut self, activity: Activity) -> bool {
        let acquired = self.state.flags.try_acquire(activity);
        if acquired {
            self.emit(SessionEvent::FlagsChanged {
                active: Some(activity),
            });
        }
        acquired
    }

    fn release(&mut self, activity: Activity) {
        if self.state.flags.active() == Some(activity) {
            self.state.flags.release(activity);
            self.emit(SessionEvent::FlagsChanged { active: None });
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}
