use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kiosk_gateway::api::ApiServer;
use kiosk_gateway::face::{
    enroll_directory, FaceGallery, FaceIdentifier, HttpFaceEncoder, HttpFrameSource,
};
use kiosk_gateway::llm::ChatReplyGenerator;
use kiosk_gateway::session::{Orchestrator, SessionTuning};
use kiosk_gateway::voice::{
    rms, HostedTts, MicCapture, MicPhraseSource, SpeechRenderer, SttProvider, Transcriber,
    TtsProvider,
};
use kiosk_gateway::{Config, Persona};

/// Kiosk - face-aware voice receptionist gateway
#[derive(Parser)]
#[command(name = "kiosk", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "KIOSK_PORT", default_value = "8001")]
    port: u16,

    /// Path to the face gallery file
    #[arg(long)]
    gallery: Option<PathBuf>,

    /// Path to a persona TOML file
    #[arg(long)]
    persona: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the face gallery from a labeled image directory
    Enroll {
        /// Directory of sample images (`<dir>/<label>/*.jpg`)
        dir: PathBuf,
        /// Output path (defaults to the configured gallery path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test the speech rendering pipeline
    TestTts {
        /// Text to render
        #[arg(default_value = "Hello! This is a test of the speech pipeline.")]
        text: String,
    },
    /// Test the camera snapshot endpoint
    TestCamera,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,kiosk_gateway=info",
        1 => "info,kiosk_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(gallery) = cli.gallery {
        config.gallery_path = gallery;
    }
    if let Some(persona) = cli.persona {
        config.persona_path = Some(persona);
    }

    if let Some(command) = cli.command {
        return match command {
            Command::Enroll { dir, output } => cmd_enroll(&config, &dir, output).await,
            Command::TestMic { duration } => test_mic(duration),
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::TestCamera => test_camera(&config).await,
        };
    }

    let persona = match &config.persona_path {
        Some(path) => Persona::load(path)?,
        None => Persona::default(),
    };

    let gallery = Arc::new(FaceGallery::load_or_empty(&config.gallery_path)?);

    let frames = Arc::new(HttpFrameSource::new(config.face.camera_url.clone()));
    let encoder = Arc::new(HttpFaceEncoder::new(
        config.face.embed_url.clone(),
        config.api_keys.face.clone(),
    ));
    let identity = Arc::new(FaceIdentifier::new(
        frames,
        encoder,
        gallery,
        config.face.tolerance,
    ));

    let speech = Arc::new(MicPhraseSource::new(Arc::new(build_transcriber(&config)?)));

    let renderer = Arc::new(SpeechRenderer::new(
        Arc::new(build_tts(&config)?),
        config.voice.tts_speed,
        persona.animation.clone(),
        persona.expression.clone(),
    ));

    if config.api_keys.llm.is_none() {
        tracing::warn!("no chat completion credential set; replies will be apologies");
    }
    let replies = Arc::new(ChatReplyGenerator::new(
        config.llm.chat_url.clone(),
        config.api_keys.llm.clone().unwrap_or_default(),
        config.llm.model.clone(),
        persona.system_prompt.clone(),
    ));

    let tuning = SessionTuning {
        identify_timeout: config.face.identify_timeout,
        ..SessionTuning::default()
    };

    let orchestrator = Arc::new(Orchestrator::new(
        identity, speech, replies, renderer, persona, tuning,
    ));

    tracing::info!(port = cli.port, "kiosk gateway ready");
    ApiServer::new(orchestrator, cli.port).run().await?;

    Ok(())
}

/// Build the configured transcriber
fn build_transcriber(config: &Config) -> anyhow::Result<Transcriber> {
    let provider: SttProvider = config.voice.stt_provider.parse()?;
    let key = match provider {
        SttProvider::Whisper => config.api_keys.openai.clone(),
        SttProvider::Deepgram => config.api_keys.deepgram.clone(),
    };
    Ok(Transcriber::new(
        provider,
        key.unwrap_or_default(),
        config.voice.stt_model.clone(),
    )?)
}

/// Build the configured synthesizer
fn build_tts(config: &Config) -> anyhow::Result<HostedTts> {
    let provider: TtsProvider = config.voice.tts_provider.parse()?;
    let key = match provider {
        TtsProvider::OpenAi => config.api_keys.openai.clone(),
        TtsProvider::ElevenLabs => config.api_keys.elevenlabs.clone(),
    };
    Ok(HostedTts::new(
        provider,
        key.unwrap_or_default(),
        config.voice.tts_voice.clone(),
        config.voice.tts_model.clone(),
    )?)
}

/// Build the gallery from a labeled image directory
async fn cmd_enroll(config: &Config, dir: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let encoder = HttpFaceEncoder::new(
        config.face.embed_url.clone(),
        config.api_keys.face.clone(),
    );

    let gallery = enroll_directory(dir, &encoder).await?;
    let path = output.unwrap_or_else(|| config.gallery_path.clone());
    gallery.save(&path)?;

    println!("{} face encodings saved to {}", gallery.len(), path.display());
    Ok(())
}

/// Test microphone input with a level meter
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut mic = MicCapture::open()?;
    mic.start()?;

    for i in 0..duration {
        std::thread::sleep(Duration::from_secs(1));

        let samples = mic.drain();
        let energy = rms(&samples);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = ((energy * 100.0).min(50.0)) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | [{meter}]", i + 1);
    }

    mic.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    Ok(())
}

/// Render a line of text and write the result to a WAV file
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Rendering: \"{text}\"\n");

    let renderer = SpeechRenderer::new(
        Arc::new(build_tts(config)?),
        config.voice.tts_speed,
        "Idle".to_string(),
        "smile".to_string(),
    );

    let payload = kiosk_gateway::voice::RenderSpeech::render(&renderer, text).await?;
    let wav = base64::engine::general_purpose::STANDARD.decode(&payload.audio)?;

    let out = PathBuf::from("kiosk-tts.wav");
    std::fs::write(&out, wav)?;

    println!(
        "Wrote {} ({}ms, {} mouth cues)",
        out.display(),
        payload.duration.as_millis(),
        payload.visemes.len()
    );
    Ok(())
}

/// Fetch one frame from the camera snapshot endpoint
async fn test_camera(config: &Config) -> anyhow::Result<()> {
    use kiosk_gateway::face::FrameSource as _;

    println!("Fetching a frame from {}...", config.face.camera_url);

    let frames = HttpFrameSource::new(config.face.camera_url.clone());
    let frame = frames.grab().await?;

    println!("Got {} bytes", frame.len());
    Ok(())
}
