//! Utterance endpointing.
//!
//! Segments a continuous sample stream into utterances using RMS-based
//! thresholding: a segment opens when the level crosses the speech threshold
//! and closes after a sustained stretch of silence.

use crate::defaults;
use std::time::Instant;

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Configuration for the utterance endpointer.
#[derive(Debug, Clone, Copy)]
pub struct EndpointerConfig {
    /// RMS threshold for detecting speech (0.0 to 1.0).
    pub speech_threshold: f32,
    /// Duration of silence before the utterance is considered ended (milliseconds).
    pub silence_duration_ms: u32,
    /// Minimum duration of speech for a segment to be emitted (milliseconds).
    pub min_speech_ms: u32,
}

impl Default for EndpointerConfig {
    fn default() -> Self {
        Self {
            speech_threshold: defaults::VAD_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
            min_speech_ms: defaults::MIN_SPEECH_MS,
        }
    }
}

/// Endpointer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No open segment.
    Idle,
    /// Speech detected, segment accumulating.
    Speaking,
    /// Silence inside an open segment, waiting to confirm the end.
    Trailing,
}

/// Segments a stream of PCM samples into discrete utterances.
///
/// Feed sample batches through [`Endpointer::push`]; when a segment closes,
/// the accumulated samples are returned and the endpointer goes idle again.
pub struct Endpointer<C: Clock = SystemClock> {
    config: EndpointerConfig,
    state: State,
    clock: C,
    buffer: Vec<i16>,
    speech_start: Option<Instant>,
    silence_start: Option<Instant>,
}

impl Endpointer<SystemClock> {
    /// Creates an endpointer using the system clock.
    pub fn new(config: EndpointerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Endpointer<C> {
    /// Creates an endpointer with the given clock (mockable for tests).
    pub fn with_clock(config: EndpointerConfig, clock: C) -> Self {
        Self {
            config,
            state: State::Idle,
            clock,
            buffer: Vec::new(),
            speech_start: None,
            silence_start: None,
        }
    }

    /// Pushes a batch of samples; returns a completed utterance segment if
    /// this batch closed one.
    ///
    /// Segments shorter than `min_speech_ms` of speech are discarded.
    pub fn push(&mut self, samples: &[i16]) -> Option<Vec<i16>> {
        if samples.is_empty() {
            return None;
        }

        let is_speech = calculate_rms(samples) > self.config.speech_threshold;
        let now = self.clock.now();

        match self.state {
            State::Idle => {
                if is_speech {
                    self.state = State::Speaking;
                    self.speech_start = Some(now);
                    self.buffer.extend_from_slice(samples);
                }
                None
            }
            State::Speaking => {
                self.buffer.extend_from_slice(samples);
                if !is_speech {
                    self.state = State::Trailing;
                    self.silence_start = Some(now);
                }
                None
            }
            State::Trailing => {
                self.buffer.extend_from_slice(samples);
                if is_speech {
                    self.state = State::Speaking;
                    self.silence_start = None;
                    return None;
                }

                let silence_ms = self
                    .silence_start
                    .map(|start| now.duration_since(start).as_millis() as u32)
                    .unwrap_or(0);
                if silence_ms < self.config.silence_duration_ms {
                    return None;
                }

                // Segment closed. Speech ran from speech_start until silence began.
                let speech_ms = match (self.speech_start, self.silence_start) {
                    (Some(start), Some(end)) => end.duration_since(start).as_millis() as u32,
                    _ => 0,
                };
                let segment = std::mem::take(&mut self.buffer);
                self.reset();

                if speech_ms >= self.config.min_speech_ms {
                    Some(segment)
                } else {
                    None
                }
            }
        }
    }

    /// Returns true if a segment is currently open.
    pub fn is_active(&self) -> bool {
        self.state != State::Idle
    }

    /// Drops any open segment and returns to idle.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
        self.speech_start = None;
        self.silence_start = None;
    }
}

/// Calculates the normalized Root Mean Square of audio samples (0.0 to 1.0).
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock clock that advances only when told to.
    #[derive(Debug, Clone)]
    struct MockClock {
        current: Arc<Mutex<Instant>>,
    }

    impl MockClock {
        fn new() -> Self {
            Self {
                current: Arc::new(Mutex::new(Instant::now())),
            }
        }

        fn advance(&self, duration: Duration) {
            let mut current = self.current.lock().unwrap();
            *current += duration;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.current.lock().unwrap()
        }
    }

    fn loud(n: usize) -> Vec<i16> {
        vec![8000; n]
    }

    fn quiet(n: usize) -> Vec<i16> {
        vec![0; n]
    }

    fn endpointer_with_clock(clock: MockClock) -> Endpointer<MockClock> {
        Endpointer::with_clock(
            EndpointerConfig {
                speech_threshold: 0.02,
                silence_duration_ms: 500,
                min_speech_ms: 100,
            },
            clock,
        )
    }

    #[test]
    fn test_calculate_rms_silence_and_full_scale() {
        assert_eq!(calculate_rms(&[]), 0.0);
        assert_eq!(calculate_rms(&[0, 0, 0]), 0.0);
        let full = vec![i16::MAX; 100];
        assert!((calculate_rms(&full) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_idle_silence_emits_nothing() {
        let mut ep = endpointer_with_clock(MockClock::new());
        assert!(ep.push(&quiet(160)).is_none());
        assert!(!ep.is_active());
    }

    #[test]
    fn test_speech_then_sustained_silence_emits_segment() {
        let clock = MockClock::new();
        let mut ep = endpointer_with_clock(clock.clone());

        assert!(ep.push(&loud(160)).is_none());
        assert!(ep.is_active());

        clock.advance(Duration::from_millis(200));
        assert!(ep.push(&loud(160)).is_none());

        clock.advance(Duration::from_millis(10));
        assert!(ep.push(&quiet(160)).is_none()); // silence begins

        clock.advance(Duration::from_millis(600));
        let segment = ep.push(&quiet(160)).expect("segment should close");
        assert_eq!(segment.len(), 160 * 4);
        assert!(!ep.is_active());
    }

    #[test]
    fn test_brief_silence_does_not_close_segment() {
        let clock = MockClock::new();
        let mut ep = endpointer_with_clock(clock.clone());

        ep.push(&loud(160));
        clock.advance(Duration::from_millis(200));
        ep.push(&quiet(160)); // silence begins
        clock.advance(Duration::from_millis(100)); // under the 500ms gap
        assert!(ep.push(&quiet(160)).is_none());
        assert!(ep.is_active());

        // Speech resumes, silence timer resets
        assert!(ep.push(&loud(160)).is_none());
        clock.advance(Duration::from_millis(600));
        assert!(ep.push(&quiet(160)).is_none()); // fresh silence window
    }

    #[test]
    fn test_too_short_speech_is_discarded() {
        let clock = MockClock::new();
        let mut ep = endpointer_with_clock(clock.clone());

        ep.push(&loud(160));
        clock.advance(Duration::from_millis(50)); // below min_speech_ms
        ep.push(&quiet(160));
        clock.advance(Duration::from_millis(600));
        assert!(ep.push(&quiet(160)).is_none());
        assert!(!ep.is_active());
    }

    #[test]
    fn test_reset_drops_open_segment() {
        let mut ep = endpointer_with_clock(MockClock::new());
        ep.push(&loud(160));
        assert!(ep.is_active());
        ep.reset();
        assert!(!ep.is_active());
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut ep = endpointer_with_clock(MockClock::new());
        assert!(ep.push(&[]).is_none());
        assert!(!ep.is_active());
    }
}
