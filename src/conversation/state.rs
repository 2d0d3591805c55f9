//! Conversation state: phase, answers, candidate articles and exclusive flags

use serde::Serialize;

use crate::news::Article;

/// Articles announced per page
pub const PAGE_SIZE: usize = 5;

/// Named state of the conversation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Speaking a question from the fixed sequence
    AskingQuestion,
    /// Capturing the user's spoken reply
    Recording,
    /// Waiting on the transcription service
    Transcribing,
    /// Announcing candidate articles and waiting for a choice
    SelectingArticle,
    /// Reading the selected article aloud
    ReadingArticle,
    /// Asking whether to read another article
    AwaitingContinuation,
    /// Session over
    Idle,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AskingQuestion => "asking question",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::SelectingArticle => "selecting article",
            Self::ReadingArticle => "reading article",
            Self::AwaitingContinuation => "awaiting continuation",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// An exclusive device activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Speaking,
    Recording,
    Processing,
}

/// Speaking / recording / processing guards
///
/// At most one activity is held at a time, so the three flags can never be
/// true together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusiveFlags {
    active: Option<Activity>,
}

impl ExclusiveFlags {
    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        matches!(self.active, Some(Activity::Speaking))
    }

    #[must_use]
    pub const fn is_recording(&self) -> bool {
        matches!(self.active, Some(Activity::Recording))
    }

    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self.active, Some(Activity::Processing))
    }

    /// No activity is held
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Currently held activity
    #[must_use]
    pub const fn active(&self) -> Option<Activity> {
        self.active
    }

    /// Take `activity` if nothing else is held
    pub const fn try_acquire(&mut self, activity: Activity) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(activity);
        true
    }

    /// Release `activity` if it is the one held
    pub fn release(&mut self, activity: Activity) {
        if self.active == Some(activity) {
            self.active = None;
        }
    }
}

/// Questions asked at the start of every session, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKey {
    Topic,
    Outlet,
}

/// The fixed question sequence
pub const QUESTIONS: [QuestionKey; 2] = [QuestionKey::Topic, QuestionKey::Outlet];

impl QuestionKey {
    /// Spoken question
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Topic => {
                "What would you like to read about today? You can say 'skip' to skip this."
            }
            Self::Outlet => {
                "What specific outlet would you like to choose? You can say 'skip' to skip this."
            }
        }
    }

    /// Spoken acknowledgement when the user skips
    #[must_use]
    pub const fn skip_acknowledgement(self) -> &'static str {
        match self {
            Self::Topic => "Skipping topic selection.",
            Self::Outlet => "Skipping outlet selection.",
        }
    }
}

impl std::fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Topic => "topic",
            Self::Outlet => "outlet",
        })
    }
}

/// Reply to one question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum Answer {
    #[default]
    Pending,
    Given(String),
    Skipped,
}

impl Answer {
    /// Whether the question has been dealt with (skipping counts)
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Answer text; empty when skipped or pending
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Given(text) => text,
            Self::Pending | Self::Skipped => "",
        }
    }
}

/// Answers keyed by question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    topic: Answer,
    outlet: Answer,
}

impl Answers {
    #[must_use]
    pub const fn get(&self, key: QuestionKey) -> &Answer {
        match key {
            QuestionKey::Topic => &self.topic,
            QuestionKey::Outlet => &self.outlet,
        }
    }

    pub fn set(&mut self, key: QuestionKey, answer: Answer) {
        match key {
            QuestionKey::Topic => self.topic = answer,
            QuestionKey::Outlet => self.outlet = answer,
        }
    }

    /// Answer text for `key`, `""` when skipped
    #[must_use]
    pub fn value(&self, key: QuestionKey) -> &str {
        self.get(key).text()
    }

    #[must_use]
    pub fn all_answered(&self) -> bool {
        QUESTIONS.iter().all(|key| self.get(*key).is_answered())
    }
}

/// Authoritative state of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub phase: Phase,
    /// Position in [`QUESTIONS`], capped at its length
    pub step_index: usize,
    pub answers: Answers,
    /// Results of the last search, fixed until the next search
    pub candidate_articles: Vec<Article>,
    /// Zero-based page over `candidate_articles`
    pub page_index: usize,
    pub selected_article: Option<Article>,
    pub flags: ExclusiveFlags,
    /// Every question has been answered and the search has not run yet
    pub ready_to_fetch: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    /// Fresh session state at the first question
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::AskingQuestion,
            step_index: 0,
            answers: Answers::default(),
            candidate_articles: Vec::new(),
            page_index: 0,
            selected_article: None,
            flags: ExclusiveFlags::default(),
            ready_to_fetch: false,
        }
    }

    /// Question at `step_index`, if any remain
    #[must_use]
    pub fn current_question(&self) -> Option<QuestionKey> {
        QUESTIONS.get(self.step_index).copied()
    }

    /// Store the answer to the current question and advance
    ///
    /// Raises `ready_to_fetch` once the last question is answered.
    pub fn record_answer(&mut self, answer: Answer) {
        let Some(key) = self.current_question() else {
            return;
        };
        self.answers.set(key, answer);
        self.step_index = (self.step_index + 1).min(QUESTIONS.len());
        if self.step_index == QUESTIONS.len() {
            self.ready_to_fetch = true;
        }
    }

    /// Replace the candidate list and rewind to the first page
    pub fn set_candidates(&mut self, articles: Vec<Article>) {
        self.candidate_articles = articles;
        self.page_index = 0;
        self.selected_article = None;
    }

    /// Articles on the current page
    #[must_use]
    pub fn current_page(&self) -> &[Article] {
        let start = (self.page_index * PAGE_SIZE).min(self.candidate_articles.len());
        let end = (start + PAGE_SIZE).min(self.candidate_articles.len());
        &self.candidate_articles[start..end]
    }

    /// Whether another page follows the current one
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        (self.page_index + 1) * PAGE_SIZE < self.candidate_articles.len()
    }

    /// Move to the next page; `false` when already on the last one
    pub fn next_page(&mut self) -> bool {
        if !self.has_next_page() {
            return false;
        }
        self.page_index += 1;
        true
    }

    /// Select the 1-based `choice` on the current page
    pub fn select(&mut self, choice: usize) -> Option<&Article> {
        let article = choice
            .checked_sub(1)
            .and_then(|i| self.current_page().get(i))
            .cloned()?;
        self.selected_article = Some(article);
        self.selected_article.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles(n: usize) -> Vec<Article> {
        (1..=n)
            .map(|i| Article {
                title: format!("Story {i}"),
                source_name: "Wire".to_string(),
                url: format!("https://news.test/{i}"),
                description: None,
            })
            .collect()
    }

    #[test]
    fn test_flags_are_exclusive() {
        let mut flags = ExclusiveFlags::default();
        assert!(flags.try_acquire(Activity::Speaking));
        assert!(!flags.try_acquire(Activity::Recording));
        assert!(flags.is_speaking());
        assert!(!flags.is_recording());

        flags.release(Activity::Recording);
        assert!(flags.is_speaking());

        flags.release(Activity::Speaking);
        assert!(flags.is_idle());
        assert!(flags.try_acquire(Activity::Recording));
    }

    #[test]
    fn test_answers_advance_and_raise_fetch() {
        let mut state = ConversationState::new();
        assert_eq!(state.current_question(), Some(QuestionKey::Topic));

        state.record_answer(Answer::Given("climate".to_string()));
        assert_eq!(state.step_index, 1);
        assert!(!state.ready_to_fetch);

        state.record_answer(Answer::Skipped);
        assert_eq!(state.step_index, 2);
        assert!(state.ready_to_fetch);
        assert!(state.answers.all_answered());
        assert_eq!(state.answers.value(QuestionKey::Topic), "climate");
        assert_eq!(state.answers.value(QuestionKey::Outlet), "");

        state.record_answer(Answer::Given("ignored".to_string()));
        assert_eq!(state.step_index, 2);
    }

    #[test]
    fn test_pagination() {
        let mut state = ConversationState::new();
        state.set_candidates(articles(12));

        assert_eq!(state.current_page().len(), 5);
        assert!(state.has_next_page());
        assert!(state.next_page());
        assert_eq!(state.current_page()[0].title, "Story 6");
        assert!(state.next_page());
        assert_eq!(state.current_page().len(), 2);
        assert!(!state.has_next_page());
        assert!(!state.next_page());
        assert_eq!(state.page_index, 2);
    }

    #[test]
    fn test_select_within_page() {
        let mut state = ConversationState::new();
        state.set_candidates(articles(3));

        assert!(state.select(0).is_none());
        assert!(state.select(5).is_none());
        assert!(state.selected_article.is_none());

        assert_eq!(state.select(3).map(|a| a.title.clone()).as_deref(), Some("Story 3"));
        assert_eq!(state.selected_article.as_ref().unwrap().url, "https://news.test/3");
    }
}
