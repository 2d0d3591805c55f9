//! Voice I/O
//!
//! Microphone capture and WAV encoding, MP3 playback, remote text-to-speech,
//! and the device-backed speech and audio input ports.

mod capture;
mod microphone;
mod playback;
mod speech;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, input_device_available, samples_to_wav, wav_to_samples};
pub use microphone::DeviceMicrophone;
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use speech::DeviceSpeech;
pub use tts::TextToSpeech;
