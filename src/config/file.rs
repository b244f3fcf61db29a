//! TOML configuration file loading
//!
//! Supports `~/.config/malik/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MalikConfigFile {
    /// Language-model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Web server configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Language-model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// API base URL (without the `/v1/...` suffix)
    pub base_url: Option<String>,

    /// Name of the secret holding the completion API key
    pub secret_name: Option<String>,

    /// Path to a local JSON secrets file
    pub secrets_file: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "onyx")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Wake phrase for the passive-listen loop
    pub wake_word: Option<String>,

    /// Ambient-noise calibration window in seconds (0 disables)
    pub calibrate_secs: Option<f32>,

    /// Maximum time to wait for a phrase, in seconds
    pub phrase_limit_secs: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Web server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// Port to listen on
    pub port: Option<u16>,

    /// Static files directory (generated audio lands in `audio/` below it)
    pub static_dir: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MalikConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MalikConfigFile {
    config_file_path().map_or_else(MalikConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults with a warning.
pub fn load_config_file_from(path: &Path) -> MalikConfigFile {
    if !path.exists() {
        return MalikConfigFile::default();
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
                MalikConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MalikConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/malik/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Return the config directory: `~/.config/malik`
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("malik"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let fc: MalikConfigFile = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(fc.llm.model.as_deref(), Some("gpt-4o"));
        assert_eq!(fc.server.port, Some(9000));
        assert!(fc.voice.tts_voice.is_none());
        assert!(fc.api_keys.openai.is_none());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nmodel = ").unwrap();

        let fc = load_config_file_from(&path);
        assert!(fc.llm.model.is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let fc = load_config_file_from(Path::new("/nonexistent/malik/config.toml"));
        assert!(fc.server.port.is_none());
    }
}
