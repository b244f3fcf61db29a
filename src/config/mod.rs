//! Configuration management for Malik
//!
//! Values resolve env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

pub use file::MalikConfigFile;

/// Default completion model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default name of the secret holding the completion API key
pub const DEFAULT_SECRET_NAME: &str = "MALIK_SECRETS";

/// Default wake phrase
pub const DEFAULT_WAKE_WORD: &str = "hey malik";

/// `OpenAI` API root, shared by completion, TTS and Whisper
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Malik configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language-model configuration
    pub llm: LlmConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Web server configuration
    pub server: ServerConfig,
}

/// Language-model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// API base URL
    pub base_url: String,

    /// Secret name used when no plain API key is configured
    pub secret_name: String,

    /// Local JSON secrets file
    pub secrets_file: PathBuf,
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProviderKind {
    #[default]
    OpenAi,
    ElevenLabs,
}

impl FromStr for TtsProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttProviderKind {
    #[default]
    Whisper,
    Deepgram,
}

impl FromStr for SttProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// TTS backend
    pub tts_provider: TtsProviderKind,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub tts_model: String,

    /// Fixed voice identity
    pub tts_voice: String,

    /// TTS speed multiplier (`OpenAI` only)
    pub tts_speed: f32,

    /// STT backend
    pub stt_provider: SttProviderKind,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// Wake phrase for the passive-listen loop
    pub wake_word: String,

    /// Ambient-noise calibration window in seconds
    pub calibrate_secs: f32,

    /// Maximum time to wait for a phrase, in seconds
    pub phrase_limit_secs: f32,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (completion, Whisper, TTS)
    pub openai: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,
}

/// Web server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Static files directory
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Directory generated reply audio is written to
    #[must_use]
    pub fn audio_dir(&self) -> PathBuf {
        self.static_dir.join("audio")
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed config file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn from_sources(fc: MalikConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // a variable set to "" counts as unset
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            openai: non_blank(env("OPENAI_API_KEY").or(fc.api_keys.openai)),
            elevenlabs: non_blank(env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs)),
            deepgram: non_blank(env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram)),
        };

        let secrets_file = env("MALIK_SECRETS_FILE")
            .or(fc.llm.secrets_file)
            .map_or_else(default_secrets_file, PathBuf::from);

        let llm = LlmConfig {
            model: env("MALIK_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: fc.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            base_url: env("OPENAI_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            secret_name: env("MALIK_SECRET_NAME")
                .or(fc.llm.secret_name)
                .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
            secrets_file,
        };

        let tts_provider = env("MALIK_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .map(|s| s.parse::<TtsProviderKind>())
            .transpose()?
            .unwrap_or_default();
        let stt_provider = env("MALIK_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .map(|s| s.parse::<SttProviderKind>())
            .transpose()?
            .unwrap_or_default();

        let (default_tts_model, default_tts_voice) = match tts_provider {
            TtsProviderKind::OpenAi => ("tts-1", "onyx"),
            TtsProviderKind::ElevenLabs => ("eleven_monolingual_v1", "pNInz6obpgDQGcFmaJgB"),
        };
        let default_stt_model = match stt_provider {
            SttProviderKind::Whisper => "whisper-1",
            SttProviderKind::Deepgram => "nova-2",
        };

        let voice = VoiceConfig {
            tts_provider,
            tts_model: env("MALIK_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model.to_string()),
            tts_voice: env("MALIK_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| default_tts_voice.to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0),
            stt_provider,
            stt_model: env("MALIK_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model.to_string()),
            wake_word: env("MALIK_WAKE_WORD")
                .or(fc.voice.wake_word)
                .unwrap_or_else(|| DEFAULT_WAKE_WORD.to_string()),
            calibrate_secs: fc.voice.calibrate_secs.unwrap_or(0.5),
            phrase_limit_secs: fc.voice.phrase_limit_secs.unwrap_or(15.0),
        };

        let server = ServerConfig {
            host: env("MALIK_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env("MALIK_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8080),
            static_dir: env("MALIK_STATIC_DIR")
                .or(fc.server.static_dir)
                .map_or_else(|| PathBuf::from("static"), PathBuf::from),
        };

        Ok(Self {
            llm,
            voice,
            api_keys,
            server,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Default local secrets file: `~/.config/malik/secrets.json`
fn default_secrets_file() -> PathBuf {
    file::config_dir().map_or_else(
        || PathBuf::from(".config/malik/secrets.json"),
        |d| d.join("secrets.json"),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(MalikConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.secret_name, "MALIK_SECRETS");
        assert_eq!(config.voice.tts_provider, TtsProviderKind::OpenAi);
        assert_eq!(config.voice.tts_voice, "onyx");
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert_eq!(config.voice.wake_word, "hey malik");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.audio_dir(), PathBuf::from("static/audio"));
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let fc: MalikConfigFile = toml::from_str(
            r#"
            [llm]
            model = "from-file"

            [server]
            port = 9000

            [api_keys]
            openai = "file-key"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_from(&[("MALIK_LLM_MODEL", "from-env"), ("OPENAI_API_KEY", "env-key")]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "from-env");
        assert_eq!(config.api_keys.openai.as_deref(), Some("env-key"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn blank_env_values_count_as_unset() {
        let fc: MalikConfigFile = toml::from_str(
            r#"
            [api_keys]
            openai = "file-key"
            deepgram = ""
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_from(&[("OPENAI_API_KEY", ""), ("MALIK_HOST", "  ")]),
        )
        .unwrap();

        assert_eq!(config.api_keys.openai.as_deref(), Some("file-key"));
        assert!(config.api_keys.deepgram.is_none());
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn port_falls_back_to_generic_env() {
        let config =
            Config::from_sources(MalikConfigFile::default(), env_from(&[("PORT", "5000")])).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn provider_changes_voice_defaults() {
        let config = Config::from_sources(
            MalikConfigFile::default(),
            env_from(&[("MALIK_TTS_PROVIDER", "ElevenLabs"), ("MALIK_STT_PROVIDER", "deepgram")]),
        )
        .unwrap();

        assert_eq!(config.voice.tts_provider, TtsProviderKind::ElevenLabs);
        assert_eq!(config.voice.tts_model, "eleven_monolingual_v1");
        assert_eq!(config.voice.stt_model, "nova-2");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = Config::from_sources(
            MalikConfigFile::default(),
            env_from(&[("MALIK_TTS_PROVIDER", "polly")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
