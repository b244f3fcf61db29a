//! Speech-to-text (STT) recognition

use async_trait::async_trait;

use crate::config::{ApiKeys, OPENAI_BASE_URL, SttProviderKind, VoiceConfig};
use crate::{Error, Result};

/// Converts recorded speech to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if the recognition service fails
    async fn transcribe(&self, wav: &[u8]) -> Result<String>;
}

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

impl DeepgramResponse {
    fn into_transcript(self) -> String {
        self.results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .unwrap_or_default()
    }
}

/// Cloud speech recognition over HTTP
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttProviderKind,
    openai_base_url: String,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String) -> Result<Self> {
        Self::new(SttProviderKind::Whisper, api_key, model)
    }

    /// Create a new STT instance using Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: String, model: String) -> Result<Self> {
        Self::new(SttProviderKind::Deepgram, api_key, model)
    }

    /// Create the configured STT backend
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let key = match voice.stt_provider {
            SttProviderKind::Whisper => keys.openai.clone(),
            SttProviderKind::Deepgram => keys.deepgram.clone(),
        };
        Self::new(voice.stt_provider, key.unwrap_or_default(), voice.stt_model.clone())
    }

    fn new(provider: SttProviderKind, api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            let name = match provider {
                SttProviderKind::Whisper => "OpenAI API key required for Whisper",
                SttProviderKind::Deepgram => "Deepgram API key required",
            };
            return Err(Error::Config(name.to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider,
            openai_base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Point Whisper requests at a compatible endpoint
    #[must_use]
    pub fn with_openai_base_url(mut self, base_url: &str) -> Self {
        self.openai_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn whisper_url(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.openai_base_url)
    }

    /// Transcribe using `OpenAI` Whisper
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(self.whisper_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Stt(format!("Whisper request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| Error::Stt(format!("Deepgram request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await?;
        Ok(result.into_transcript())
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), provider = ?self.provider, "starting transcription");

        let transcript = match self.provider {
            SttProviderKind::Whisper => self.transcribe_whisper(wav).await?,
            SttProviderKind::Deepgram => self.transcribe_deepgram(wav).await?,
        };

        tracing::debug!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_config_error() {
        assert!(matches!(
            SpeechToText::new_whisper(String::new(), "whisper-1".to_string()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SpeechToText::new_deepgram(String::new(), "nova-2".to_string()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn whisper_follows_base_url() {
        let stt = SpeechToText::new_whisper("sk-test".to_string(), "whisper-1".to_string()).unwrap();
        assert_eq!(stt.whisper_url(), "https://api.openai.com/v1/audio/transcriptions");

        let local = stt.with_openai_base_url("http://localhost:8000/");
        assert_eq!(local.whisper_url(), "http://localhost:8000/v1/audio/transcriptions");
    }

    #[test]
    fn deepgram_transcript_takes_first_alternative() {
        let body = r#"{"results":{"channels":[{"alternatives":[
            {"transcript":"hey malik what time is it"},
            {"transcript":"hey malik what time isn't"}
        ]}]}}"#;
        let parsed: DeepgramResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_transcript(), "hey malik what time is it");
    }

    #[test]
    fn deepgram_empty_channels_is_empty_transcript() {
        let parsed: DeepgramResponse =
            serde_json::from_str(r#"{"results":{"channels":[]}}"#).unwrap();
        assert_eq!(parsed.into_transcript(), "");
    }
}
