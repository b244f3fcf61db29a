//! Utterance boundary detection
//!
//! Energy-based endpointing: speech starts when chunk RMS crosses the
//! threshold and ends after a stretch of silence. An optional ambient-noise
//! calibration raises the threshold above the room's noise floor.

/// Threshold used when no calibration ran (or the room is quiet)
pub const BASE_ENERGY_THRESHOLD: f32 = 0.03;

/// Calibrated threshold = ambient RMS times this factor
const AMBIENT_MULTIPLIER: f32 = 1.5;

/// Minimum voiced audio for an utterance, at 16kHz
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence that ends an utterance, at 16kHz
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the utterance detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech
    Idle,
    /// Speech started, accumulating until trailing silence
    Speaking,
    /// Utterance boundary reached
    Complete,
}

/// Finds the boundaries of a single spoken phrase
#[derive(Debug)]
pub struct UtteranceDetector {
    threshold: f32,
    state: DetectorState,
    speech_buffer: Vec<f32>,
    speech_samples: usize,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: BASE_ENERGY_THRESHOLD,
            state: DetectorState::Idle,
            speech_buffer: Vec::new(),
            speech_samples: 0,
            silence_counter: 0,
        }
    }

    /// Adjust the energy threshold from a sample of ambient noise
    ///
    /// Returns the threshold now in effect
    pub fn calibrate(&mut self, ambient: &[f32]) -> f32 {
        let ambient_energy = calculate_energy(ambient);
        self.threshold = (ambient_energy * AMBIENT_MULTIPLIER).max(BASE_ENERGY_THRESHOLD);
        tracing::debug!(ambient_energy, threshold = self.threshold, "calibrated for ambient noise");
        self.threshold
    }

    /// Feed a chunk of samples
    ///
    /// Returns true once an utterance boundary has been reached
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let energy = calculate_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            DetectorState::Idle => {
                if is_speech {
                    self.state = DetectorState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.speech_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
            }
            DetectorState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.speech_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    if self.speech_samples >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(
                            samples = self.speech_buffer.len(),
                            voiced = self.speech_samples,
                            "utterance complete"
                        );
                        self.state = DetectorState::Complete;
                    } else {
                        tracing::trace!(voiced = self.speech_samples, "too little speech, resetting");
                        self.reset();
                    }
                }
            }
            DetectorState::Complete => {}
        }

        self.state == DetectorState::Complete
    }

    /// Whether enough speech is buffered to be worth transcribing
    #[must_use]
    pub fn has_speech(&self) -> bool {
        self.state != DetectorState::Idle && self.speech_samples >= MIN_SPEECH_SAMPLES
    }

    /// Take the buffered utterance and return to idle
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let samples = std::mem::take(&mut self.speech_buffer);
        self.reset();
        samples
    }

    /// Reset detector to idle state, keeping the calibrated threshold
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.speech_buffer.clear();
        self.speech_samples = 0;
        self.silence_counter = 0;
    }

    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
