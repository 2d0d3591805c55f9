//! Shared test utilities: in-memory port fakes and fixtures

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use herald::conversation::{ConversationEngine, Ports, SessionControl, SessionTimings};
use herald::ports::{
    ArticleSource, AudioInput, NewsSource, RecordedAudio, RecordingHandle, SpeechCompletion,
    SpeechOptions, SpeechOutput, Transcriber,
};
use herald::{Article, Error, NewsQuery, Result};

type SpeakHook = Box<dyn Fn(&str) + Send + Sync>;

/// Speech output that records what was said
#[derive(Default)]
pub struct FakeSpeech {
    spoken: Mutex<Vec<(String, SpeechOptions)>>,
    stops: AtomicUsize,
    hook: OnceLock<SpeakHook>,
}

impl FakeSpeech {
    /// Run `hook` with the text of every utterance as it starts
    pub fn on_speak(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        let _ = self.hook.set(Box::new(hook));
    }

    pub fn texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn options_for(&self, text: &str) -> Option<SpeechOptions> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, options)| *options)
    }

    pub fn said(&self, text: &str) -> bool {
        self.texts().iter().any(|t| t == text)
    }

    pub fn said_containing(&self, fragment: &str) -> bool {
        self.texts().iter().any(|t| t.contains(fragment))
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechOutput for FakeSpeech {
    async fn speak(&self, text: &str, options: &SpeechOptions) -> SpeechCompletion {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), *options));
        if let Some(hook) = self.hook.get() {
            hook(text);
        }
        SpeechCompletion::done()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Microphone that always "hears" a short clip
pub struct FakeMicrophone {
    pub permission: bool,
    pub fail_start: AtomicBool,
    pub return_nothing: AtomicBool,
    recordings: AtomicUsize,
}

impl Default for FakeMicrophone {
    fn default() -> Self {
        Self {
            permission: true,
            fail_start: AtomicBool::new(false),
            return_nothing: AtomicBool::new(false),
            recordings: AtomicUsize::new(0),
        }
    }
}

impl FakeMicrophone {
    pub fn denied() -> Self {
        Self {
            permission: false,
            ..Self::default()
        }
    }

    pub fn recordings(&self) -> usize {
        self.recordings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioInput for FakeMicrophone {
    async fn request_permission(&self) -> bool {
        self.permission
    }

    async fn start_recording(&self) -> Result<RecordingHandle> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Recording("device busy".to_string()));
        }
        self.recordings.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingHandle::new())
    }

    async fn stop_recording(&self, _handle: RecordingHandle) -> Option<RecordedAudio> {
        if self.return_nothing.load(Ordering::SeqCst) {
            return None;
        }
        Some(RecordedAudio::wav(b"RIFF-fake-audio".to_vec()))
    }
}

/// One scripted transcription result
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Fail,
    Hang,
}

/// Transcriber that replays a script, then shuts the session down
#[derive(Default)]
pub struct ScriptedTranscriber {
    replies: Mutex<VecDeque<Reply>>,
    control: OnceLock<SessionControl>,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn texts(texts: &[&'static str]) -> Self {
        Self::new(texts.iter().copied().map(Reply::Text))
    }

    /// Shut down `control` once the script runs out
    pub fn attach(&self, control: SessionControl) {
        let _ = self.control.set(control);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &RecordedAudio) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::Fail) => Err(Error::Transcription("provider error".to_string())),
            Some(Reply::Hang) => std::future::pending().await,
            None => {
                if let Some(control) = self.control.get() {
                    control.shutdown();
                }
                Err(Error::Transcription("script exhausted".to_string()))
            }
        }
    }
}

/// News source returning a fixed list and recording queries
#[derive(Default)]
pub struct FakeNews {
    articles: Vec<Article>,
    queries: Mutex<Vec<NewsQuery>>,
}

impl FakeNews {
    pub fn with(articles: Vec<Article>) -> Self {
        Self {
            articles,
            queries: Mutex::default(),
        }
    }

    pub fn queries(&self) -> Vec<NewsQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSource for FakeNews {
    async fn search(&self, query: &NewsQuery) -> Vec<Article> {
        self.queries.lock().unwrap().push(query.clone());
        self.articles.clone()
    }
}

/// Article pages served from memory; unknown URLs fail
#[derive(Default)]
pub struct FakeArticles {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeArticles {
    pub fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArticleSource for FakeArticles {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("{url} returned 404 Not Found")))
    }
}

/// All fakes wired into one engine
pub struct Harness {
    pub speech: Arc<FakeSpeech>,
    pub microphone: Arc<FakeMicrophone>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub news: Arc<FakeNews>,
    pub articles: Arc<FakeArticles>,
}

impl Harness {
    pub fn new(transcriber: ScriptedTranscriber, news: FakeNews, articles: FakeArticles) -> Self {
        Self {
            speech: Arc::new(FakeSpeech::default()),
            microphone: Arc::new(FakeMicrophone::default()),
            transcriber: Arc::new(transcriber),
            news: Arc::new(news),
            articles: Arc::new(articles),
        }
    }

    pub fn with_microphone(mut self, microphone: FakeMicrophone) -> Self {
        self.microphone = Arc::new(microphone);
        self
    }

    /// Engine with near-zero delays, shut down once the script runs out
    pub fn engine(&self) -> ConversationEngine {
        self.engine_with(fast_timings())
    }

    pub fn engine_with(&self, timings: SessionTimings) -> ConversationEngine {
        let ports = Ports {
            speech: self.speech.clone(),
            microphone: self.microphone.clone(),
            transcriber: self.transcriber.clone(),
            news: self.news.clone(),
            articles: self.articles.clone(),
        };
        let engine = ConversationEngine::new(ports, timings);
        self.transcriber.attach(engine.control());
        engine
    }
}

pub fn fast_timings() -> SessionTimings {
    SessionTimings::uniform(Duration::from_millis(1))
}

pub fn article(n: usize) -> Article {
    Article {
        title: format!("Headline {n}"),
        source_name: "The Daily".to_string(),
        url: format!("https://news.example/{n}"),
        description: None,
    }
}

pub fn articles(count: usize) -> Vec<Article> {
    (1..=count).map(article).collect()
}

/// Article page whose `<article>` holds `sentences` as paragraphs
pub fn article_html(sentences: &[&str]) -> String {
    let paragraphs: String = sentences.iter().map(|s| format!("<p>{s}</p>")).collect();
    format!(
        "<html><head><title>Story</title></head><body>\
         <nav><a href=\"/\">Home</a><a href=\"/world\">World</a></nav>\
         <article>{paragraphs}</article>\
         <footer>Copyright The Daily</footer></body></html>"
    )
}

pub const STORY: [&str; 4] = [
    "The city council approved the new transit plan on Tuesday evening after a long debate.",
    "Construction of the first line is expected to begin early next spring.",
    "Officials said the project would be funded through a mix of federal grants and local bonds.",
    "Residents will be able to comment on the station designs during public hearings.",
];
