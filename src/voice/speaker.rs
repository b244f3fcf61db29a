//! Speech delivery: synthesize, stage in a temp file, play, delete

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AudioPlayback, Synthesizer};
use crate::{Error, Result};

/// Plays a staged audio file, blocking until done
pub trait Player: Send + Sync {
    /// Play the file at `path`
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    fn play_file(&self, path: &Path) -> Result<()>;
}

impl Player for AudioPlayback {
    fn play_file(&self, path: &Path) -> Result<()> {
        Self::play_file(self, path)
    }
}

/// Speaks replies out loud
#[derive(Clone)]
pub struct Speaker {
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    temp_dir: Option<PathBuf>,
}

impl Speaker {
    /// Speaker playing through the default output device
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self::with_player(synthesizer, Arc::new(AudioPlayback::new()))
    }

    #[must_use]
    pub fn with_player(synthesizer: Arc<dyn Synthesizer>, player: Arc<dyn Player>) -> Self {
        Self {
            synthesizer,
            player,
            temp_dir: None,
        }
    }

    /// Stage audio files under `dir` instead of the system temp dir
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Speak `text`; failures are logged and swallowed
    pub async fn speak(&self, text: &str) {
        tracing::info!("Malik says: {text}");
        if let Err(e) = self.try_speak(text).await {
            tracing::error!(error = %e, "speech output failed");
        }
    }

    /// Speak `text`, reporting failures
    ///
    /// # Errors
    ///
    /// Returns error if synthesis, staging or playback fails
    pub async fn try_speak(&self, text: &str) -> Result<()> {
        let audio = self.synthesizer.synthesize(text).await?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("malik-").suffix(".mp3");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&audio)?;
        file.flush()?;

        let path = file.path().to_path_buf();
        tracing::debug!(path = %path.display(), bytes = audio.len(), "staged speech audio");

        let player = Arc::clone(&self.player);
        let played = tokio::task::spawn_blocking(move || player.play_file(&path))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?;

        // removes the staged file whether or not playback worked
        file.close()?;
        played
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct Fixed(&'static [u8]);

    #[async_trait]
    impl Synthesizer for Fixed {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    struct Failing;

    #[async_trait]
    impl Synthesizer for Failing {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            Err(Error::Tts("service unavailable".to_string()))
        }
    }

    /// Records what it was asked to play
    #[derive(Default)]
    struct Recorder {
        played: Mutex<Vec<(PathBuf, Vec<u8>)>>,
        fail: bool,
    }

    impl Player for Recorder {
        fn play_file(&self, path: &Path) -> Result<()> {
            let bytes = std::fs::read(path)?;
            self.played.lock().unwrap().push((path.to_path_buf(), bytes));
            if self.fail {
                return Err(Error::Audio("no device".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn stages_plays_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let speaker = Speaker::with_player(Arc::new(Fixed(b"ID3fake")), recorder.clone())
            .temp_dir(dir.path());

        speaker.try_speak("hello").await.unwrap();

        let played = recorder.played.lock().unwrap();
        assert_eq!(played.len(), 1);
        let (path, bytes) = &played[0];
        assert_eq!(bytes.as_slice(), b"ID3fake");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));
        assert!(!path.exists(), "staged file should be deleted");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn each_clip_gets_a_unique_name() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let speaker = Speaker::with_player(Arc::new(Fixed(b"a")), recorder.clone())
            .temp_dir(dir.path());

        speaker.speak("one").await;
        speaker.speak("two").await;

        let played = recorder.played.lock().unwrap();
        assert_eq!(played.len(), 2);
        assert_ne!(played[0].0, played[1].0);
    }

    #[tokio::test]
    async fn playback_failure_still_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let speaker = Speaker::with_player(Arc::new(Fixed(b"a")), recorder.clone())
            .temp_dir(dir.path());

        assert!(speaker.try_speak("hi").await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_is_swallowed() {
        let recorder = Arc::new(Recorder::default());
        let speaker = Speaker::with_player(Arc::new(Failing), recorder.clone());

        speaker.speak("hi").await;
        assert!(recorder.played.lock().unwrap().is_empty());
    }
}
