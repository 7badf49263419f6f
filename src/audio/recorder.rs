use crate::error::{CallguardError, Result};
use std::collections::VecDeque;

/// Trait for audio source devices.
///
/// This trait allows swapping implementations (real microphone vs mock).
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read and drain the samples captured since the last read.
    ///
    /// # Returns
    /// Vector of 16-bit PCM audio samples, possibly empty.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Mock audio source for testing.
///
/// Serves a scripted sequence of reads, then empty batches.
#[derive(Debug, Clone, Default)]
pub struct MockAudioSource {
    reads: VecDeque<Vec<i16>>,
    is_started: bool,
    should_fail_read: bool,
}

impl MockAudioSource {
    /// Create a mock source with no scripted reads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of samples to be returned by a future `read_samples` call.
    pub fn with_read(mut self, samples: Vec<i16>) -> Self {
        self.reads.push_back(samples);
        self
    }

    /// Configure every `read_samples` call to fail.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Whether `start` has been called without a matching `stop`.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(CallguardError::AudioCapture {
                message: "mock read failure".to_string(),
            });
        }
        Ok(self.reads.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_serves_scripted_reads_in_order() {
        let mut source = MockAudioSource::new()
            .with_read(vec![1, 2, 3])
            .with_read(vec![4, 5]);

        source.start().unwrap();
        assert_eq!(source.read_samples().unwrap(), vec![1, 2, 3]);
        assert_eq!(source.read_samples().unwrap(), vec![4, 5]);
        // Exhausted script yields empty reads, like a quiet microphone
        assert!(source.read_samples().unwrap().is_empty());
    }

    #[test]
    fn test_mock_source_read_failure() {
        let mut source = MockAudioSource::new().with_read_failure();
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn test_mock_source_tracks_started_state() {
        let mut source = MockAudioSource::new();
        assert!(!source.is_started());
        source.start().unwrap();
        assert!(source.is_started());
        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_audio_source_is_object_safe() {
        let mut source: Box<dyn AudioSource> = Box::new(MockAudioSource::new());
        assert!(source.start().is_ok());
        assert!(source.read_samples().is_ok());
        assert!(source.stop().is_ok());
    }
}
