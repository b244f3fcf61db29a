//! Voice processing module
//!
//! Microphone capture, utterance detection, recognition, synthesis and
//! playback. Cloud STT/TTS sit behind the `Transcriber` and `Synthesizer`
//! traits.

mod capture;
mod listener;
mod playback;
mod speaker;
mod stt;
mod tts;
mod utterance;
mod wake_word;

pub use capture::{AudioCapture, SAMPLE_RATE, SampleSource, StreamResampler, samples_to_wav};
pub use listener::{Heard, Listener, NOT_CAUGHT, SERVICE_DOWN};
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use speaker::{Player, Speaker};
pub use stt::{SpeechToText, Transcriber};
pub use tts::{Synthesizer, TextToSpeech};
pub use utterance::{BASE_ENERGY_THRESHOLD, DetectorState, UtteranceDetector, calculate_energy};
pub use wake_word::WakeWord;
