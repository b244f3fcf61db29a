//! Text-to-speech (TTS) synthesis

use async_trait::async_trait;

use crate::config::{ApiKeys, OPENAI_BASE_URL, TtsProviderKind, VoiceConfig};
use crate::{Error, Result};

/// Converts reply text to MP3 audio
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize text, returning MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the synthesis service fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Cloud speech synthesis over HTTP with a fixed voice
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProviderKind,
    openai_base_url: String,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: String, voice: String, speed: f32, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            speed,
            model,
            provider: TtsProviderKind::OpenAi,
            openai_base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Create a new TTS instance using `ElevenLabs`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: String, voice_id: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice: voice_id,
            speed: 1.0,
            model,
            provider: TtsProviderKind::ElevenLabs,
            openai_base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Create the configured TTS backend
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        match voice.tts_provider {
            TtsProviderKind::OpenAi => Self::new_openai(
                keys.openai.clone().unwrap_or_default(),
                voice.tts_voice.clone(),
                voice.tts_speed,
                voice.tts_model.clone(),
            ),
            TtsProviderKind::ElevenLabs => Self::new_elevenlabs(
                keys.elevenlabs.clone().unwrap_or_default(),
                voice.tts_voice.clone(),
                voice.tts_model.clone(),
            ),
        }
    }

    /// Point `OpenAI` requests at a compatible endpoint
    #[must_use]
    pub fn with_openai_base_url(mut self, base_url: &str) -> Self {
        self.openai_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// The fixed voice identity
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    fn request(&self, text: &str) -> reqwest::RequestBuilder {
        match self.provider {
            TtsProviderKind::OpenAi => self
                .client
                .post(format!("{}/v1/audio/speech", self.openai_base_url))
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({
                    "model": self.model,
                    "input": text,
                    "voice": self.voice,
                    "speed": self.speed,
                    "response_format": "mp3",
                })),
            TtsProviderKind::ElevenLabs => self
                .client
                .post(format!(
                    "https://api.elevenlabs.io/v1/text-to-speech/{}",
                    self.voice
                ))
                .header("xi-api-key", &self.api_key)
                .header("Accept", "audio/mpeg")
                .json(&serde_json::json!({
                    "text": text,
                    "model_id": self.model,
                })),
        }
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::Tts("nothing to synthesize".to_string()));
        }

        tracing::debug!(provider = ?self.provider, voice = %self.voice, chars = text.len(), "synthesizing");

        let response = self
            .request(text)
            .send()
            .await
            .map_err(|e| Error::Tts(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Tts(format!("{:?} TTS error {status}: {body}", self.provider)));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_config_error() {
        let result = TextToSpeech::new_openai(
            String::new(),
            "onyx".to_string(),
            1.0,
            "tts-1".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn from_config_picks_provider_key() {
        let voice = VoiceConfig {
            tts_provider: TtsProviderKind::ElevenLabs,
            tts_model: "eleven_monolingual_v1".to_string(),
            tts_voice: "voice-id".to_string(),
            tts_speed: 1.0,
            stt_provider: crate::config::SttProviderKind::Whisper,
            stt_model: "whisper-1".to_string(),
            wake_word: "hey malik".to_string(),
            calibrate_secs: 0.5,
            phrase_limit_secs: 15.0,
        };
        let only_openai = ApiKeys {
            openai: Some("sk-test".to_string()),
            ..ApiKeys::default()
        };
        assert!(TextToSpeech::from_config(&voice, &only_openai).is_err());

        let with_eleven = ApiKeys {
            elevenlabs: Some("xi-test".to_string()),
            ..ApiKeys::default()
        };
        let tts = TextToSpeech::from_config(&voice, &with_eleven).unwrap();
        assert_eq!(tts.voice(), "voice-id");
    }

    #[test]
    fn openai_requests_follow_base_url() {
        let tts = TextToSpeech::new_openai(
            "sk-test".to_string(),
            "onyx".to_string(),
            1.0,
            "tts-1".to_string(),
        )
        .unwrap()
        .with_openai_base_url("http://localhost:8000/");

        let request = tts.request("hello").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8000/v1/audio/speech");
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_request() {
        let tts = TextToSpeech::new_openai(
            "sk-test".to_string(),
            "onyx".to_string(),
            1.0,
            "tts-1".to_string(),
        )
        .unwrap();
        assert!(matches!(tts.synthesize("   ").await, Err(Error::Tts(_))));
    }
}
