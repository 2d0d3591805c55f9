//! TOML configuration file loading
//!
//! Supports `~/.config/herald/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HeraldConfigFile {
    /// Speech output configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Transcription client configuration
    #[serde(default)]
    pub transcription: TranscriptionFileConfig,

    /// News client configuration
    #[serde(default)]
    pub news: NewsFileConfig,

    /// Article fetcher configuration
    #[serde(default)]
    pub fetch: FetchFileConfig,

    /// Conversation timing configuration
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Backend proxy configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// TTS provider ("openai" or "elevenlabs")
    pub provider: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub voice: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,

    /// Playback volume in `0.0..=1.0`
    pub volume: Option<f32>,

    /// Speaking rate used while reading articles
    pub reading_rate: Option<f32>,
}

/// Transcription client configuration
#[derive(Debug, Default, Deserialize)]
pub struct TranscriptionFileConfig {
    /// Backend base URL serving `/upload` and `/transcript`
    pub base_url: Option<String>,

    /// Delay between status polls in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Maximum number of status polls
    pub max_polls: Option<u32>,
}

/// News client configuration
#[derive(Debug, Default, Deserialize)]
pub struct NewsFileConfig {
    /// Backend base URL serving `/news`
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Article fetcher configuration
#[derive(Debug, Default, Deserialize)]
pub struct FetchFileConfig {
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Refuse hosts resolving to private or loopback addresses
    pub block_private_addresses: Option<bool>,

    /// Hosts exempt from address blocking
    pub trusted_hosts: Option<Vec<String>>,
}

/// Conversation timing configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Pause between a spoken prompt and recording, in milliseconds
    pub settle_ms: Option<u64>,

    /// Recording window for answers and selections, in milliseconds
    pub listen_window_ms: Option<u64>,

    /// Per-listen transcription deadline, in seconds
    pub watchdog_secs: Option<u64>,

    /// Deadline for the continuation re-listen, in seconds
    pub continuation_timeout_secs: Option<u64>,

    /// Consecutive failed turns before the session resets
    pub max_reprompts: Option<u32>,
}

/// Backend proxy configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// Listen port
    pub port: Option<u16>,

    /// Upstream headline search endpoint
    pub news_upstream: Option<String>,

    /// Upstream transcription API base
    pub transcription_upstream: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub assemblyai: Option<String>,
    pub news: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `HeraldConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HeraldConfigFile {
    config_file_path().map_or_else(HeraldConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults with a warning.
pub fn load_config_file_from(path: &Path) -> HeraldConfigFile {
    if !path.exists() {
        return HeraldConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HeraldConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HeraldConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/herald/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("herald").join("config.toml"))
}
