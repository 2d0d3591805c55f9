//! Herald - voice-driven news reader
//!
//! Asks the listener for a topic and an outlet, searches headlines, lets
//! them pick an article by voice and reads its text aloud sentence by
//! sentence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Conversation Engine                 │
//! │   questions  │  selection  │  reading  │  continue  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ ports
//! ┌────────────────────▼────────────────────────────────┐
//! │  Speech  │  Microphone  │  Transcriber  │  News  │  │
//! │  (TTS)   │  (cpal)      │  (upload+poll)│ Fetch  │  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │        Backend proxy (`herald serve`)               │
//! │        /news  │  /upload  │  /transcript            │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod news;
pub mod ports;
pub mod transcription;
pub mod voice;

pub use config::Config;
pub use conversation::{ConversationEngine, Ports, SessionControl, SessionEvent, SessionOutcome, SessionTimings};
pub use error::{Error, Result};
pub use extract::{ContentExtractor, ExtractedDocument};
pub use fetch::ArticleFetcher;
pub use news::{Article, NewsClient, NewsQuery};
pub use transcription::TranscriptionClient;
