use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use herald::api::ApiServer;
use herald::conversation::ResetReason;
use herald::ports::{ArticleSource, RecordedAudio};
use herald::voice::{
    AudioCapture, AudioPlayback, DecodedAudio, DeviceMicrophone, DeviceSpeech, TextToSpeech,
    decode_mp3,
};
use herald::{
    ArticleFetcher, Config, ContentExtractor, ConversationEngine, NewsClient, NewsQuery, Ports,
    SessionEvent, SessionOutcome, TranscriptionClient,
};

/// Herald - voice-driven news reader
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start a voice session (default)
    Run {
        /// Exit after the listener declines another article
        #[arg(long)]
        once: bool,
    },
    /// Run the backend proxy for news search and transcription
    Serve {
        /// Port to listen on
        #[arg(long, env = "HERALD_PORT")]
        port: Option<u16>,
    },
    /// Extract readable sentences from an HTML file or URL
    Extract {
        /// Local path or http(s) URL
        source: String,
    },
    /// Search headlines without the voice flow
    Search {
        #[arg(short, long, default_value = "")]
        topic: String,
        #[arg(short, long, default_value = "")]
        outlet: String,
    },
    /// Transcribe a WAV file through the transcription service
    Transcribe {
        /// Path to a WAV file
        path: std::path::PathBuf,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,herald=info",
        1 => "info,herald=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Run { once: false }) {
        Command::Run { once } => run_session(config, once).await,
        Command::Serve { port } => serve(config, port).await,
        Command::Extract { source } => extract(&config, &source).await,
        Command::Search { topic, outlet } => search(&config, &topic, &outlet).await,
        Command::Transcribe { path } => transcribe(&config, &path).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Run voice sessions until interrupted
async fn run_session(config: Config, once: bool) -> anyhow::Result<()> {
    let tts = TextToSpeech::from_config(&config.speech)?;
    let ports = Ports {
        speech: Arc::new(DeviceSpeech::new(tts, config.speech.volume)),
        microphone: Arc::new(DeviceMicrophone::new()),
        transcriber: Arc::new(TranscriptionClient::new(&config.transcription)),
        news: Arc::new(NewsClient::new(&config.news)?),
        articles: Arc::new(ArticleFetcher::new(&config.fetch)?),
    };

    let mut engine = ConversationEngine::new(ports, config.session);
    let control = engine.control();
    let mut events = engine.subscribe();

    tracing::info!(session = %engine.id(), "herald ready - answer the questions aloud");

    let watcher = {
        let control = control.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::SessionReset {
                        reason: ResetReason::Farewell,
                    }) if once => {
                        control.shutdown();
                        break;
                    }
                    Ok(event) => tracing::debug!(?event, "session event"),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let interrupt = {
        let control = control.clone();
        tokio::spawn(async move {
            // first ctrl-c stops reading, second ends the session
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("stopping");
                control.stop_reading();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                control.shutdown();
            }
        })
    };

    let outcome = engine.run().await;
    interrupt.abort();
    watcher.abort();

    match outcome? {
        SessionOutcome::Stopped => tracing::info!("reading stopped"),
        SessionOutcome::Shutdown => tracing::info!("session ended"),
    }
    Ok(())
}

/// Run the backend proxy
async fn serve(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if config.server.news_api_key.is_none() {
        tracing::warn!("NEWS_API_KEY not set - /news will return 503");
    }
    if config.server.transcription_api_key.is_none() {
        tracing::warn!("ASSEMBLYAI_API_KEY not set - transcription routes will return 503");
    }

    let server = ApiServer::new(&config.server)?;
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}

/// Print the sentences extracted from a page
async fn extract(config: &Config, source: &str) -> anyhow::Result<()> {
    let html = if source.starts_with("http://") || source.starts_with("https://") {
        ArticleFetcher::new(&config.fetch)?.fetch_html(source).await?
    } else {
        tokio::fs::read_to_string(source).await?
    };

    let document = ContentExtractor::default().extract(&html)?;
    println!(
        "{} sentences via {:?} ({} chars)\n",
        document.sentences.len(),
        document.source,
        document.body_text.chars().count()
    );
    for (i, sentence) in document.sentences.iter().enumerate() {
        println!("{:3}. {sentence}", i + 1);
    }
    Ok(())
}

/// Print headline search results
async fn search(config: &Config, topic: &str, outlet: &str) -> anyhow::Result<()> {
    let query = NewsQuery::new(topic, outlet);
    let articles = NewsClient::new(&config.news)?.try_search(&query).await?;

    if articles.is_empty() {
        println!("No articles found");
    }
    for (i, article) in articles.iter().enumerate() {
        println!("{:2}. {} ({})", i + 1, article.title, article.source_name);
        println!("    {}", article.url);
    }
    Ok(())
}

/// Transcribe a WAV file
async fn transcribe(config: &Config, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path).await?;
    let audio = RecordedAudio::wav(bytes);

    println!("Uploading {} bytes...", audio.bytes.len());
    let text = TranscriptionClient::new(&config.transcription)
        .transcribe_audio(&audio)
        .await?;
    println!("{text}");
    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        println!("Sample rate: {} Hz", capture.sample_rate());
        println!("---");

        for i in 0..duration {
            std::thread::sleep(Duration::from_secs(1));

            let samples = capture.take_buffer();
            let energy = calculate_rms(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            // Visual meter
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

            println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
        }

        capture.stop();
        Ok(())
    })
    .await??;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    play(DecodedAudio {
        samples,
        sample_rate,
    })
    .await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::from_config(&config.speech)?;
    println!("Synthesizing speech with {:?}...", tts.provider());
    let mp3_data = tts.synthesize(text, None).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    play(decode_mp3(&mp3_data)?).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}

async fn play(audio: DecodedAudio) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || {
        AudioPlayback::new()?.play_blocking(audio, 1.0, &AtomicBool::new(false))
    })
    .await??;
    Ok(())
}
