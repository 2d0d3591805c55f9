//! Voice pipeline integration tests
//!
//! Tests audio encoding without requiring audio hardware

use std::io::Cursor;

use herald::voice::{SAMPLE_RATE, decode_mp3, samples_to_wav, wav_to_samples};

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // 44-byte header plus 16-bit samples
    assert_eq!(wav_data.len(), 44 + samples.len() * 2);
}

#[test]
fn test_wav_keeps_device_rate() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, 44_100).unwrap();

    let reader = hound::WavReader::new(Cursor::new(&wav_data)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let (samples, rate) = wav_to_samples(&wav_data).unwrap();
    assert_eq!(rate, 44_100);
    assert_eq!(samples.len(), original_samples.len());
    for (read, original) in samples.iter().zip(&original_samples) {
        assert!((read - original).abs() < 0.001, "{read} vs {original}");
    }
}

#[test]
fn test_out_of_range_samples_are_clamped() {
    let wav_data = samples_to_wav(&[2.0, -3.0], SAMPLE_RATE).unwrap();
    let mut reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    let pcm: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(pcm, vec![i16::MAX, -i16::MAX]);
}

#[test]
fn test_stereo_wav_is_downmixed() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for (left, right) in [(16_384_i16, 0_i16), (-16_384, -16_384)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();
    }

    let (samples, rate) = wav_to_samples(&cursor.into_inner()).unwrap();
    assert_eq!(rate, SAMPLE_RATE);
    assert_eq!(samples.len(), 2);
    assert!((samples[0] - 0.25).abs() < 0.001);
    assert!((samples[1] + 0.5).abs() < 0.001);
}

#[test]
fn test_invalid_audio_is_rejected() {
    assert!(wav_to_samples(b"not a wav file").is_err());
    if let Ok(audio) = decode_mp3(b"not an mp3 file") {
        assert!(audio.samples.is_empty());
    }
}
