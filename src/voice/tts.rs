//! Text-to-speech synthesis through `OpenAI` or `ElevenLabs`

use secrecy::{ExposeSecret, SecretString};

use crate::config::{SpeechConfig, TtsProvider};
use crate::{Error, Result};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Synthesizes speech from text as MP3
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a synthesizer for the configured provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = config.api_key().cloned().ok_or_else(|| {
            Error::Config(match config.provider {
                TtsProvider::OpenAi => "OPENAI_API_KEY required for TTS".to_string(),
                TtsProvider::ElevenLabs => "ELEVENLABS_API_KEY required for TTS".to_string(),
            })
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice: config.voice.clone(),
            model: config.model.clone(),
            provider: config.provider,
        })
    }

    /// Provider in use
    #[must_use]
    pub const fn provider(&self) -> TtsProvider {
        self.provider
    }

    /// Synthesize `text`, optionally at a speaking rate (1.0 = normal)
    ///
    /// Returns MP3 bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the request
    pub async fn synthesize(&self, text: &str, rate: Option<f32>) -> Result<Vec<u8>> {
        match self.provider {
            TtsProvider::OpenAi => self.synthesize_openai(text, rate).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, rate).await,
        }
    }

    async fn synthesize_openai(&self, text: &str, rate: Option<f32>) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
            speed: rate.unwrap_or(1.0).clamp(0.25, 4.0),
        };

        let response = self
            .client
            .post(OPENAI_SPEECH_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        read_audio(response, "OpenAI").await
    }

    async fn synthesize_elevenlabs(&self, text: &str, rate: Option<f32>) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct VoiceSettings {
            speed: f32,
        }

        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            voice_settings: Option<VoiceSettings>,
        }

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: rate.map(|r| VoiceSettings {
                speed: r.clamp(0.7, 1.2),
            }),
        };

        let response = self
            .client
            .post(format!("{ELEVENLABS_TTS_URL}/{}", self.voice))
            .header("xi-api-key", self.api_key.expose_secret())
            .header("accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        read_audio(response, "ElevenLabs").await
    }
}

async fn read_audio(response: reqwest::Response, provider: &str) -> Result<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Tts(format!("{provider} TTS error {status}: {body}")));
    }

    Ok(response.bytes().await?.to_vec())
}

impl std::fmt::Debug for TextToSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextToSpeech")
            .field("provider", &self.provider)
            .field("voice", &self.voice)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
