//! Speech-to-text: recognizer abstraction and the Whisper backend.

pub mod recognizer;
pub mod whisper;

pub use recognizer::{MockRecognizer, Recognizer};
pub use whisper::{WhisperConfig, WhisperRecognizer};
