//! Configuration for the kiosk gateway
//!
//! All settings are assembled from environment variables with sensible
//! defaults so the gateway starts on a bare machine next to its co-located
//! camera and face-embedding services.

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

/// Kiosk gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (gallery file, cache)
    pub data_dir: PathBuf,

    /// Path to the serialized face gallery
    pub gallery_path: PathBuf,

    /// Optional persona file (TOML); embedded default when absent
    pub persona_path: Option<PathBuf>,

    /// Face identification configuration
    pub face: FaceConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Chat completion configuration
    pub llm: LlmConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Face identification configuration
#[derive(Debug, Clone)]
pub struct FaceConfig {
    /// Snapshot endpoint of the camera service (returns one JPEG per GET)
    pub camera_url: String,

    /// Face-embedding service endpoint (image in, per-face embeddings out)
    pub embed_url: String,

    /// Maximum embedding distance accepted as a match
    pub tolerance: f32,

    /// How long to scan frames before giving up on identification
    pub identify_timeout: Duration,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: String,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: String,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// Playback-speed transform applied after synthesis
    pub tts_speed: f32,
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completion endpoint
    pub chat_url: String,

    /// Model identifier
    pub model: String,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper STT and TTS)
    pub openai: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,

    /// Face-embedding service API key
    pub face: Option<String>,

    /// Chat completion bearer credential
    pub llm: Option<String>,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable fails to parse
    pub fn load() -> Result<Self> {
        let data_dir = std::env::var("KIOSK_DATA_DIR")
            .map_or_else(|_| default_data_dir(), PathBuf::from);

        let gallery_path = std::env::var("KIOSK_GALLERY")
            .map_or_else(|_| data_dir.join("gallery.json"), PathBuf::from);

        let persona_path = std::env::var("KIOSK_PERSONA").ok().map(PathBuf::from);

        let face = FaceConfig {
            camera_url: env_or("KIOSK_CAMERA_URL", "http://localhost:8081/snapshot"),
            embed_url: env_or("KIOSK_FACE_EMBED_URL", "http://localhost:8082/embed"),
            tolerance: env_parse("KIOSK_FACE_TOLERANCE", 0.4)?,
            identify_timeout: Duration::from_secs_f64(env_parse(
                "KIOSK_IDENTIFY_TIMEOUT_SECS",
                10.0,
            )?),
        };

        let voice = VoiceConfig {
            stt_provider: env_or("KIOSK_STT_PROVIDER", "whisper"),
            stt_model: env_or("KIOSK_STT_MODEL", "whisper-1"),
            tts_provider: env_or("KIOSK_TTS_PROVIDER", "openai"),
            tts_model: env_or("KIOSK_TTS_MODEL", "tts-1"),
            tts_voice: env_or("KIOSK_TTS_VOICE", "alloy"),
            tts_speed: env_parse("KIOSK_TTS_SPEED", 1.2)?,
        };

        let llm = LlmConfig {
            chat_url: env_or(
                "KIOSK_CHAT_URL",
                "https://api.groq.com/openai/v1/chat/completions",
            ),
            model: env_or("KIOSK_LLM_MODEL", "llama-3.3-70b-versatile"),
        };

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok(),
            elevenlabs: std::env::var("ELEVENLABS_API_KEY").ok(),
            deepgram: std::env::var("DEEPGRAM_API_KEY").ok(),
            face: std::env::var("KIOSK_FACE_API_KEY").ok(),
            llm: std::env::var("KIOSK_LLM_API_KEY")
                .or_else(|_| std::env::var("GROQ_API_KEY"))
                .ok(),
        };

        Ok(Self {
            data_dir,
            gallery_path,
            persona_path,
            face,
            voice,
            llm,
            api_keys,
        })
    }
}

/// Return the platform data directory for kiosk files
///
/// Uses `~/.local/share/omni/kiosk/` on Linux
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "omni", "kiosk").map_or_else(
        || PathBuf::from(".data/kiosk"),
        |d| d.data_dir().to_path_buf(),
    )
}

/// Read an environment variable with a default
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable with a default
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| crate::Error::Config(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        let config = Config::load().unwrap();
        assert!(config.face.tolerance > 0.0);
        assert!(!config.voice.stt_provider.is_empty());
        assert!(!config.llm.chat_url.is_empty());
    }

    #[test]
    fn env_parse_falls_back_to_default() {
        let value: f32 = env_parse("KIOSK_UNSET_VARIABLE_FOR_TEST", 2.5).unwrap();
        assert!((value - 2.5).abs() < f32::EPSILON);
    }
}
