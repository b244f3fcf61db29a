//! The shared pipeline: route a request, then speak the reply
//!
//! Every front-end (desktop window, passive-listen loop, web server) builds
//! its collaborators through [`Services`] and answers through [`Assistant`].

use std::sync::Arc;

use crate::brain::{CommandRouter, Completion, OpenAiCompletion, Reply};
use crate::voice::{Listener, SpeechToText, Speaker, Synthesizer, TextToSpeech, Transcriber};
use crate::{Config, secrets};

/// External collaborators resolved from configuration
///
/// Anything that cannot be configured is left out and logged; callers fall
/// back to fixed replies or text-only output.
#[derive(Clone)]
pub struct Services {
    pub router: CommandRouter,
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

impl Services {
    /// Resolve API keys and build the completion, TTS and STT clients
    pub async fn from_config(config: &Config) -> Self {
        let mut keys = config.api_keys.clone();
        let api_key = secrets::completion_api_key(config).await;
        if keys.openai.as_ref().is_none_or(String::is_empty) {
            keys.openai.clone_from(&api_key);
        }

        let completion: Option<Arc<dyn Completion>> = api_key.and_then(|key| {
            OpenAiCompletion::with_base_url(
                key,
                config.llm.model.clone(),
                config.llm.temperature,
                config.llm.base_url.clone(),
            )
            .map(|c| {
                tracing::info!(model = %c.model(), "completion backend ready");
                Arc::new(c) as Arc<dyn Completion>
            })
            .map_err(|e| tracing::warn!(error = %e, "completion backend unavailable"))
            .ok()
        });

        let synthesizer: Option<Arc<dyn Synthesizer>> =
            match TextToSpeech::from_config(&config.voice, &keys)
                .map(|tts| tts.with_openai_base_url(&config.llm.base_url))
            {
                Ok(tts) => {
                    tracing::info!(provider = ?config.voice.tts_provider, voice = %tts.voice(), "speech synthesis ready");
                    Some(Arc::new(tts))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis unavailable");
                    None
                }
            };

        let transcriber: Option<Arc<dyn Transcriber>> =
            match SpeechToText::from_config(&config.voice, &keys)
                .map(|stt| stt.with_openai_base_url(&config.llm.base_url))
            {
                Ok(stt) => Some(Arc::new(stt)),
                Err(e) => {
                    tracing::warn!(error = %e, "speech recognition unavailable");
                    None
                }
            };

        Self {
            router: CommandRouter::new(completion),
            synthesizer,
            transcriber,
        }
    }

    /// Microphone listener, if speech recognition is configured
    #[must_use]
    pub fn listener(&self, config: &Config) -> Option<Listener> {
        self.transcriber
            .as_ref()
            .map(|t| Listener::from_config(Arc::clone(t), &config.voice))
    }
}

/// Routes requests and voices the replies
#[derive(Clone)]
pub struct Assistant {
    router: CommandRouter,
    speaker: Option<Speaker>,
}

impl Assistant {
    #[must_use]
    pub const fn new(router: CommandRouter, speaker: Option<Speaker>) -> Self {
        Self { router, speaker }
    }

    /// Assistant that plays replies through the default output device
    #[must_use]
    pub fn from_services(services: &Services) -> Self {
        Self::new(
            services.router.clone(),
            services.synthesizer.clone().map(Speaker::new),
        )
    }

    #[must_use]
    pub const fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Route a request to a reply
    pub async fn handle(&self, request: &str) -> Reply {
        tracing::info!(request, "handling request");
        let reply = self.router.respond(request).await;
        tracing::info!(intent = ?reply.intent, reply = %reply.text, "reply ready");
        reply
    }

    /// Speak text if a speaker is configured
    pub async fn speak(&self, text: &str) {
        match &self.speaker {
            Some(speaker) => speaker.speak(text).await,
            None => tracing::info!("Malik says: {text}"),
        }
    }

    /// Route a request and speak the reply
    pub async fn handle_and_speak(&self, request: &str) -> Reply {
        let reply = self.handle(request).await;
        self.speak(&reply.text).await;
        reply
    }
}
