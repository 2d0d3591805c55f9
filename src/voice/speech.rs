//! Speech output port backed by remote TTS and local playback

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::ports::{SpeechCompletion, SpeechOptions, SpeechOutput};

use super::playback::{AudioPlayback, decode_mp3};
use super::tts::TextToSpeech;

/// Speaks through the default output device
///
/// `rate` maps to the provider's speed, `volume` scales samples, and `pitch`
/// is not supported by the remote voices.
pub struct DeviceSpeech {
    tts: TextToSpeech,
    volume: f32,
    cancel: Arc<AtomicBool>,
}

impl DeviceSpeech {
    #[must_use]
    pub fn new(tts: TextToSpeech, volume: f32) -> Self {
        Self {
            tts,
            volume,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl SpeechOutput for DeviceSpeech {
    async fn speak(&self, text: &str, options: &SpeechOptions) -> SpeechCompletion {
        self.cancel.store(false, Ordering::Release);

        let mp3 = match self.tts.synthesize(text, options.rate).await {
            Ok(mp3) => mp3,
            Err(e) => return SpeechCompletion::failed(e.to_string()),
        };

        if self.cancel.load(Ordering::Acquire) {
            return SpeechCompletion::done();
        }

        let cancel = Arc::clone(&self.cancel);
        let volume = options.volume.unwrap_or(self.volume);

        let played = tokio::task::spawn_blocking(move || {
            let audio = decode_mp3(&mp3)?;
            AudioPlayback::new()?.play_blocking(audio, volume, &cancel)
        })
        .await;

        match played {
            Ok(Ok(())) => SpeechCompletion::done(),
            Ok(Err(e)) => SpeechCompletion::failed(e.to_string()),
            Err(e) => SpeechCompletion::failed(format!("playback task failed: {e}")),
        }
    }

    fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for DeviceSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSpeech")
            .field("tts", &self.tts)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}
