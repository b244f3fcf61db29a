//! Capture one spoken command from the microphone and recognize it

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{AudioCapture, SampleSource, Transcriber, UtteranceDetector, samples_to_wav};
use crate::config::VoiceConfig;

/// Returned when no speech could be recognized
pub const NOT_CAUGHT: &str = "Sorry, I didn't catch that.";

/// Returned when the recognition service failed
pub const SERVICE_DOWN: &str = "Speech recognition service is down.";

/// Outcome of a listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// Lower-cased transcript
    Text(String),
    /// No recognizable speech
    NotCaught,
    /// Recognition service error
    ServiceDown,
}

impl Heard {
    /// The transcript, or the literal failure string
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::NotCaught => NOT_CAUGHT.to_string(),
            Self::ServiceDown => SERVICE_DOWN.to_string(),
        }
    }

    /// The transcript, if recognition succeeded
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Listens for one utterance at a time
#[derive(Clone)]
pub struct Listener {
    transcriber: Arc<dyn Transcriber>,
    calibrate: Duration,
    phrase_limit: Duration,
    poll_interval: Duration,
}

impl Listener {
    #[must_use]
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            calibrate: Duration::from_millis(500),
            phrase_limit: Duration::from_secs(15),
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Listener using the configured calibration window and phrase limit
    #[must_use]
    pub fn from_config(transcriber: Arc<dyn Transcriber>, voice: &VoiceConfig) -> Self {
        Self::new(transcriber)
            .calibrate(Duration::from_secs_f32(voice.calibrate_secs.max(0.0)))
            .phrase_limit(Duration::from_secs_f32(voice.phrase_limit_secs.max(1.0)))
    }

    /// Ambient-noise calibration window (zero disables calibration)
    #[must_use]
    pub const fn calibrate(mut self, window: Duration) -> Self {
        self.calibrate = window;
        self
    }

    /// Give up on a phrase after this much audio
    #[must_use]
    pub const fn phrase_limit(mut self, limit: Duration) -> Self {
        self.phrase_limit = limit;
        self
    }

    /// Delay between sample polls
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Open the microphone, wait for one utterance and recognize it
    #[allow(clippy::future_not_send)]
    pub async fn listen_command(&self) -> Heard {
        let mut capture = match AudioCapture::new().and_then(|mut c| c.start().map(|()| c)) {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!(error = %e, "microphone unavailable");
                return Heard::NotCaught;
            }
        };

        tracing::info!("Malik is listening for your command...");
        let heard = self.listen_from(&mut capture).await;
        capture.stop();
        heard
    }

    /// Wait for one utterance from `source` and recognize it
    #[allow(clippy::future_not_send)]
    pub async fn listen_from(&self, source: &mut dyn SampleSource) -> Heard {
        let rate = source.sample_rate();
        let Some(samples) = self.capture_utterance(source).await else {
            tracing::debug!("no speech captured");
            return Heard::NotCaught;
        };

        let wav = match samples_to_wav(&samples, rate) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode utterance");
                return Heard::NotCaught;
            }
        };

        match self.transcriber.transcribe(&wav).await {
            Ok(text) if text.trim().is_empty() => Heard::NotCaught,
            Ok(text) => {
                let text = text.trim().to_lowercase();
                tracing::info!("You said: {text}");
                Heard::Text(text)
            }
            Err(e) => {
                tracing::error!(error = %e, "speech recognition failed");
                Heard::ServiceDown
            }
        }
    }

    #[allow(
        clippy::future_not_send,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    async fn capture_utterance(&self, source: &mut dyn SampleSource) -> Option<Vec<f32>> {
        let rate = source.sample_rate() as f32;
        let calibrate_samples = (self.calibrate.as_secs_f32() * rate) as usize;
        let limit_samples = (self.phrase_limit.as_secs_f32() * rate) as usize;
        let deadline = Instant::now() + self.calibrate + self.phrase_limit + Duration::from_secs(1);

        let mut detector = UtteranceDetector::new();

        if calibrate_samples > 0 {
            let mut ambient = Vec::with_capacity(calibrate_samples);
            while ambient.len() < calibrate_samples {
                ambient.extend(self.next_chunk(source, deadline).await?);
            }
            detector.calibrate(&ambient);
        }

        let mut heard = 0usize;
        loop {
            let Some(chunk) = self.next_chunk(source, deadline).await else {
                return detector.has_speech().then(|| detector.take_utterance());
            };
            heard += chunk.len();

            if detector.process(&chunk) {
                return Some(detector.take_utterance());
            }

            if heard >= limit_samples {
                tracing::debug!(heard, "phrase limit reached");
                return detector.has_speech().then(|| detector.take_utterance());
            }
        }
    }

    /// Next non-empty chunk; `None` when the source closes or the deadline passes
    #[allow(clippy::future_not_send)]
    async fn next_chunk(&self, source: &mut dyn SampleSource, deadline: Instant) -> Option<Vec<f32>> {
        loop {
            if !self.poll_interval.is_zero() {
                tokio::time::sleep(self.poll_interval).await;
            }

            let chunk = source.take_samples()?;
            if !chunk.is_empty() {
                return Some(chunk);
            }

            if Instant::now() >= deadline {
                tracing::warn!("no audio arriving from microphone");
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Result};

    /// Replays fixed chunks, then closes
    struct Scripted(VecDeque<Vec<f32>>);

    impl SampleSource for Scripted {
        fn sample_rate(&self) -> u32 {
            16000
        }

        fn take_samples(&mut self) -> Option<Vec<f32>> {
            self.0.pop_front()
        }
    }

    fn scripted(parts: &[(f32, usize)]) -> Scripted {
        Scripted(
            parts
                .iter()
                .flat_map(|&(level, chunks)| std::iter::repeat_n(vec![level; 1600], chunks))
                .collect(),
        )
    }

    struct Says(&'static str);

    #[async_trait]
    impl Transcriber for Says {
        async fn transcribe(&self, wav: &[u8]) -> Result<String> {
            assert_eq!(&wav[0..4], b"RIFF");
            Ok(self.0.to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl Transcriber for Down {
        async fn transcribe(&self, _wav: &[u8]) -> Result<String> {
            Err(Error::Stt("503".to_string()))
        }
    }

    fn listener(transcriber: impl Transcriber + 'static) -> Listener {
        Listener::new(Arc::new(transcriber)).poll_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn recognized_speech_is_lowercased() {
        // calibration, speech, trailing silence
        let mut source = scripted(&[(0.0, 5), (0.3, 5), (0.0, 6)]);
        let heard = listener(Says("  What Time Is It ")).listen_from(&mut source).await;
        assert_eq!(heard, Heard::Text("what time is it".to_string()));
    }

    #[tokio::test]
    async fn silence_is_not_caught() {
        let mut source = scripted(&[(0.0, 20)]);
        let heard = listener(Says("ignored")).listen_from(&mut source).await;
        assert_eq!(heard.into_text(), NOT_CAUGHT);
    }

    #[tokio::test]
    async fn empty_transcript_is_not_caught() {
        let mut source = scripted(&[(0.0, 5), (0.3, 5), (0.0, 6)]);
        let heard = listener(Says("")).listen_from(&mut source).await;
        assert_eq!(heard, Heard::NotCaught);
    }

    #[tokio::test]
    async fn service_error_is_reported() {
        let mut source = scripted(&[(0.0, 5), (0.3, 5), (0.0, 6)]);
        let heard = listener(Down).listen_from(&mut source).await;
        assert_eq!(heard.into_text(), SERVICE_DOWN);
    }

    #[tokio::test]
    async fn click_is_not_sent_for_transcription() {
        let mut source = scripted(&[(0.0, 5), (0.3, 1), (0.0, 6)]);
        let heard = listener(Says("should not be heard")).listen_from(&mut source).await;
        assert_eq!(heard, Heard::NotCaught);
    }

    #[tokio::test]
    async fn phrase_limit_cuts_long_speech() {
        let mut source = scripted(&[(0.3, 100)]);
        let heard = listener(Says("a very long story"))
            .calibrate(Duration::ZERO)
            .phrase_limit(Duration::from_secs(1))
            .listen_from(&mut source)
            .await;
        assert_eq!(heard.text(), Some("a very long story"));
    }

    #[tokio::test]
    async fn loud_room_raises_threshold() {
        // ambient 0.2 => threshold 0.3; 0.25 never counts as speech
        let mut source = scripted(&[(0.2, 5), (0.25, 10), (0.0, 6)]);
        let heard = listener(Says("noise")).listen_from(&mut source).await;
        assert_eq!(heard, Heard::NotCaught);
    }
}
