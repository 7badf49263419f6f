use crate::error::{CallguardError, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

/// Trait for speech-to-text recognition.
///
/// This trait allows swapping implementations (real Whisper vs mock).
/// The recognizer is a black box: raw samples in, text out.
pub trait Recognizer: Send + Sync {
    /// Decode audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at 16kHz mono
    fn recognize(&self, audio: &[i16]) -> Result<String>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;
}

/// Implement Recognizer for Arc<T> to allow sharing across threads.
impl<T: Recognizer> Recognizer for Arc<T> {
    fn recognize(&self, audio: &[i16]) -> Result<String> {
        (**self).recognize(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock recognizer for testing.
///
/// Returns scripted responses in order, repeating the last one when the
/// script runs out.
#[derive(Debug)]
pub struct MockRecognizer {
    model_name: String,
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    should_fail: bool,
}

impl MockRecognizer {
    /// Create a mock recognizer with a single fixed response.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new("mock transcription".to_string()),
            should_fail: false,
        }
    }

    /// Append a scripted response.
    pub fn with_response(self, response: &str) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response.to_string());
        }
        self
    }

    /// Configure the mock to fail on recognize.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(&self, _audio: &[i16]) -> Result<String> {
        if self.should_fail {
            return Err(CallguardError::Recognition {
                message: "mock recognition failure".to_string(),
            });
        }
        let next = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(next) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = next.clone();
                }
                Ok(next)
            }
            None => Ok(self.last.lock().map(|l| l.clone()).unwrap_or_default()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
