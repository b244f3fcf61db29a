//! Passive-listen loop: wake word, command, reply, speak, repeat

use std::future::Future;

use crate::assistant::Assistant;
use crate::voice::{Heard, Listener, WakeWord};

/// Spoken when the wake word arrives without a command
pub const PROMPT: &str = "Yes?";

/// Anything that can hear one utterance at a time
#[allow(async_fn_in_trait)]
pub trait Ears {
    /// Wait for and recognize one utterance
    async fn hear(&mut self) -> Heard;
}

impl Ears for Listener {
    #[allow(clippy::future_not_send)]
    async fn hear(&mut self) -> Heard {
        self.listen_command().await
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    /// A shutdown command was routed
    Shutdown,
    /// The shutdown signal fired
    Interrupted,
}

/// The passive-listen loop
pub struct PassiveLoop {
    assistant: Assistant,
    wake_word: Option<WakeWord>,
}

impl PassiveLoop {
    /// Loop gated on `wake_word`; `None` treats every utterance as a command
    #[must_use]
    pub const fn new(assistant: Assistant, wake_word: Option<WakeWord>) -> Self {
        Self {
            assistant,
            wake_word,
        }
    }

    /// Run until a shutdown command is heard or `shutdown` resolves
    #[allow(clippy::future_not_send)]
    pub async fn run<E: Ears>(&self, ears: &mut E, shutdown: impl Future<Output = ()>) -> Stopped {
        let mut shutdown = std::pin::pin!(shutdown);

        match &self.wake_word {
            Some(wake) => tracing::info!(wake_word = wake.phrase(), "listening for wake word"),
            None => tracing::info!("listening for commands"),
        }

        loop {
            let heard = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    return Stopped::Interrupted;
                }
                heard = ears.hear() => heard,
            };

            let Some(command) = self.command_from(heard, ears, &mut shutdown).await else {
                continue;
            };

            let reply = self.assistant.handle_and_speak(&command).await;
            if reply.is_shutdown() {
                return Stopped::Shutdown;
            }
        }
    }

    /// The command carried by `heard`, prompting and listening again when
    /// the wake word stands alone
    #[allow(clippy::future_not_send)]
    async fn command_from<E: Ears>(
        &self,
        heard: Heard,
        ears: &mut E,
        shutdown: &mut std::pin::Pin<&mut impl Future<Output = ()>>,
    ) -> Option<String> {
        let Some(transcript) = heard.text() else {
            tracing::debug!(heard = ?heard, "nothing recognized");
            return None;
        };

        let Some(wake) = &self.wake_word else {
            return Some(transcript.to_string());
        };

        let Some(command) = wake.extract_command(transcript) else {
            tracing::debug!(transcript, "no wake word");
            return None;
        };

        if !command.is_empty() {
            return Some(command);
        }

        self.assistant.speak(PROMPT).await;
        let followup = tokio::select! {
            () = shutdown.as_mut() => return None,
            heard = ears.hear() => heard,
        };
        Some(followup.into_text())
    }
}
