//! Configuration management for Herald
//!
//! Values resolve as environment > TOML file > defaults.

pub mod file;

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::conversation::SessionTimings;
use crate::{Error, Result};

use self::file::HeraldConfigFile;

/// Default backend proxy base URL used by the clients
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8787";

/// Default backend proxy port
pub const DEFAULT_PORT: u16 = 8787;

/// Default upstream headline search endpoint
pub const DEFAULT_NEWS_UPSTREAM: &str = "https://newsapi.org/v2/top-headlines";

/// Default upstream transcription API base
pub const DEFAULT_TRANSCRIPTION_UPSTREAM: &str = "https://api.assemblyai.com/v2";

/// Herald configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Speech output (TTS) configuration
    pub speech: SpeechConfig,

    /// Transcription client configuration
    pub transcription: TranscriptionConfig,

    /// News client configuration
    pub news: NewsConfig,

    /// Article fetcher configuration
    pub fetch: FetchConfig,

    /// Conversation timings
    pub session: SessionTimings,

    /// Backend proxy configuration
    pub server: ServerConfig,
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TtsProvider {
    /// `OpenAI` speech API
    #[default]
    OpenAi,
    /// `ElevenLabs` text-to-speech API
    ElevenLabs,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" | "eleven_labs" | "eleven-labs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Which TTS backend to use
    pub provider: TtsProvider,

    /// Voice identifier (`OpenAI` voice name or `ElevenLabs` voice id)
    pub voice: String,

    /// TTS model
    pub model: String,

    /// Playback volume in `0.0..=1.0`
    pub volume: f32,

    /// `OpenAI` API key
    pub openai_api_key: Option<SecretString>,

    /// `ElevenLabs` API key
    pub elevenlabs_api_key: Option<SecretString>,
}

impl SpeechConfig {
    /// Key for the configured provider
    #[must_use]
    pub const fn api_key(&self) -> Option<&SecretString> {
        match self.provider {
            TtsProvider::OpenAi => self.openai_api_key.as_ref(),
            TtsProvider::ElevenLabs => self.elevenlabs_api_key.as_ref(),
        }
    }
}

/// Transcription client configuration
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// Backend base URL
    pub base_url: String,

    /// Optional `authorization` header value
    pub api_key: Option<SecretString>,

    /// Delay between status polls
    pub poll_interval: Duration,

    /// Maximum number of status polls
    pub max_polls: u32,
}

/// News client configuration
#[derive(Debug, Clone)]
pub struct NewsConfig {
    /// Backend base URL
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,
}

/// Article fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Refuse hosts resolving to private or loopback addresses
    pub block_private_addresses: bool,

    /// Hosts exempt from address blocking, such as a local mirror
    pub trusted_hosts: Vec<String>,
}

/// Backend proxy configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Upstream headline search endpoint
    pub news_upstream: String,

    /// Upstream transcription API base
    pub transcription_upstream: String,

    /// News provider key
    pub news_api_key: Option<SecretString>,

    /// Transcription provider key
    pub transcription_api_key: Option<SecretString>,

    /// Token clients must present on the transcription routes
    pub access_token: Option<SecretString>,
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if an environment or file value is invalid
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn from_sources(fc: HeraldConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = |key: &str, file_value: Option<String>| {
            env(key)
                .or(file_value)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };

        let provider = env("HERALD_TTS_PROVIDER")
            .or(fc.speech.provider)
            .map(|p| p.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or_default();

        let default_voice = match provider {
            TtsProvider::OpenAi => "alloy",
            TtsProvider::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
        };
        let default_model = match provider {
            TtsProvider::OpenAi => "tts-1",
            TtsProvider::ElevenLabs => "eleven_monolingual_v1",
        };

        let speech = SpeechConfig {
            provider,
            voice: env("HERALD_TTS_VOICE")
                .or(fc.speech.voice)
                .unwrap_or_else(|| default_voice.to_string()),
            model: env("HERALD_TTS_MODEL")
                .or(fc.speech.model)
                .unwrap_or_else(|| default_model.to_string()),
            volume: fc.speech.volume.unwrap_or(1.0).clamp(0.0, 1.0),
            openai_api_key: secret("OPENAI_API_KEY", fc.api_keys.openai),
            elevenlabs_api_key: secret("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
        };

        let backend_url = env("HERALD_BACKEND_URL");

        let transcription = TranscriptionConfig {
            base_url: env("HERALD_TRANSCRIPTION_URL")
                .or_else(|| backend_url.clone())
                .or(fc.transcription.base_url)
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            api_key: secret("HERALD_TRANSCRIPTION_TOKEN", None),
            poll_interval: Duration::from_millis(fc.transcription.poll_interval_ms.unwrap_or(2000)),
            max_polls: fc.transcription.max_polls.unwrap_or(90),
        };

        let news = NewsConfig {
            base_url: env("HERALD_NEWS_URL")
                .or(backend_url)
                .or(fc.news.base_url)
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            timeout: Duration::from_secs(fc.news.timeout_secs.unwrap_or(15)),
        };

        let allow_private = env("HERALD_ALLOW_PRIVATE_HOSTS")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let fetch = FetchConfig {
            timeout: Duration::from_secs(fc.fetch.timeout_secs.unwrap_or(15)),
            block_private_addresses: !allow_private
                && fc.fetch.block_private_addresses.unwrap_or(true),
            trusted_hosts: fc.fetch.trusted_hosts.unwrap_or_default(),
        };

        let mut session = SessionTimings::default();
        if let Some(ms) = fc.session.settle_ms {
            session.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = fc.session.listen_window_ms {
            session.listen_window = Duration::from_millis(ms);
        }
        if let Some(secs) = fc.session.watchdog_secs {
            session.watchdog = Duration::from_secs(secs);
        }
        if let Some(secs) = fc.session.continuation_timeout_secs {
            session.continuation_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = fc.session.max_reprompts {
            session.max_reprompts = n;
        }
        if let Some(rate) = fc.speech.reading_rate {
            session.reading_rate = rate;
        }

        let port = match env("HERALD_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid HERALD_PORT {raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        let server = ServerConfig {
            host: env("HERALD_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            news_upstream: fc
                .server
                .news_upstream
                .unwrap_or_else(|| DEFAULT_NEWS_UPSTREAM.to_string()),
            transcription_upstream: fc
                .server
                .transcription_upstream
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_UPSTREAM.to_string()),
            news_api_key: secret("NEWS_API_KEY", fc.api_keys.news),
            transcription_api_key: secret("ASSEMBLYAI_API_KEY", fc.api_keys.assemblyai),
            access_token: secret("HERALD_TRANSCRIPTION_TOKEN", None),
        };

        Ok(Self {
            speech,
            transcription,
            news,
            fetch,
            session,
            server,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(HeraldConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.speech.provider, TtsProvider::OpenAi);
        assert_eq!(config.speech.voice, "alloy");
        assert_eq!(config.transcription.base_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.transcription.poll_interval, Duration::from_secs(2));
        assert_eq!(config.transcription.max_polls, 90);
        assert!(config.fetch.block_private_addresses);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.server.news_api_key.is_none());
        assert_eq!(config.session.max_reprompts, 3);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: HeraldConfigFile = toml::from_str(
            "[speech]\nprovider = \"openai\"\nvoice = \"nova\"\n[server]\nport = 9000\n[api_keys]\nnews = \"from-file\"",
        )
        .unwrap();
        let env = env_from(&[
            ("HERALD_TTS_PROVIDER", "elevenlabs"),
            ("HERALD_PORT", "9100"),
            ("NEWS_API_KEY", "from-env"),
        ]);

        let config = Config::from_sources(fc, env).unwrap();
        assert_eq!(config.speech.provider, TtsProvider::ElevenLabs);
        assert_eq!(config.speech.voice, "nova");
        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.server.news_api_key.as_ref().map(ExposeSecret::expose_secret),
            Some("from-env")
        );
    }

    #[test]
    fn test_backend_url_applies_to_both_clients() {
        let env = env_from(&[
            ("HERALD_BACKEND_URL", "http://backend:1"),
            ("HERALD_NEWS_URL", "http://news:2"),
        ]);
        let config = Config::from_sources(HeraldConfigFile::default(), env).unwrap();
        assert_eq!(config.transcription.base_url, "http://backend:1");
        assert_eq!(config.news.base_url, "http://news:2");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let env = env_from(&[("HERALD_PORT", "eighty")]);
        assert!(Config::from_sources(HeraldConfigFile::default(), env).is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let env = env_from(&[("HERALD_TTS_PROVIDER", "polly")]);
        assert!(Config::from_sources(HeraldConfigFile::default(), env).is_err());
    }

    #[test]
    fn test_blank_keys_are_absent() {
        let env = env_from(&[("OPENAI_API_KEY", "  ")]);
        let config = Config::from_sources(HeraldConfigFile::default(), env).unwrap();
        assert!(config.speech.api_key().is_none());
    }

    #[test]
    fn test_allow_private_hosts() {
        let env = env_from(&[("HERALD_ALLOW_PRIVATE_HOSTS", "true")]);
        let config = Config::from_sources(HeraldConfigFile::default(), env).unwrap();
        assert!(!config.fetch.block_private_addresses);
    }

    #[test]
    fn test_trusted_hosts_from_file() {
        let fc: HeraldConfigFile =
            toml::from_str("[fetch]\ntrusted_hosts = [\"mirror.local\"]").unwrap();
        let config = Config::from_sources(fc, env_from(&[])).unwrap();
        assert!(config.fetch.block_private_addresses);
        assert_eq!(config.fetch.trusted_hosts, vec!["mirror.local".to_string()]);
    }
}
