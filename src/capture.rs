//! Speech capture: continuous microphone decoding on a background thread.
//!
//! Wraps an [`AudioSource`] and a [`Recognizer`]. Once started, a capture
//! thread polls the source, segments the stream into utterances, decodes
//! each segment, and fans the text out three ways: the internal transcript
//! queue (pull access via [`SpeechCapture::get_transcript`]), the transcript
//! store, and the pipeline's intake channel.

use crate::audio::endpoint::{Endpointer, EndpointerConfig, calculate_rms};
use crate::audio::recorder::AudioSource;
use crate::defaults;
use crate::error::{CallguardError, Result};
use crate::pipeline::Intake;
use crate::shutdown::{ShutdownToken, join_with_grace};
use crate::store::TranscriptStore;
use crate::stt::recognizer::Recognizer;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shared slot the capture thread returns the audio source to on exit,
/// making the source available again for a restart.
type SourceSlot = Arc<Mutex<Option<Box<dyn AudioSource>>>>;

/// One unit of recognized speech text.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// The recognized text.
    pub text: String,
    /// When recognition completed.
    pub captured_at: Instant,
}

impl Utterance {
    /// Creates an utterance stamped with the current instant.
    pub fn new(text: String) -> Self {
        Self {
            text,
            captured_at: Instant::now(),
        }
    }
}

/// Configuration for speech capture.
#[derive(Debug, Clone)]
pub struct SpeechCaptureConfig {
    /// Utterance endpointing parameters
    pub endpointer: EndpointerConfig,
    /// Interval between audio source reads
    pub poll_interval: Duration,
    /// Pause after a capture or decode error
    pub error_backoff: Duration,
    /// Bounded wait for the capture thread to exit on stop
    pub grace_period: Duration,
}

impl Default for SpeechCaptureConfig {
    fn default() -> Self {
        Self {
            endpointer: EndpointerConfig::default(),
            poll_interval: Duration::from_millis(defaults::AUDIO_POLL_INTERVAL_MS),
            error_backoff: Duration::from_millis(defaults::CAPTURE_BACKOFF_MS),
            grace_period: Duration::from_secs(defaults::STOP_GRACE_SECS),
        }
    }
}

/// Continuous speech capture with background decoding.
pub struct SpeechCapture {
    config: SpeechCaptureConfig,
    source: SourceSlot,
    recognizer: Arc<dyn Recognizer>,
    store: Option<TranscriptStore>,
    intake: Option<Intake>,
    transcript_tx: Sender<String>,
    transcript_rx: Receiver<String>,
    token: ShutdownToken,
    thread: Option<JoinHandle<()>>,
}

impl SpeechCapture {
    /// Creates a capture instance over the given source and recognizer.
    pub fn new(source: Box<dyn AudioSource>, recognizer: Arc<dyn Recognizer>) -> Self {
        let (transcript_tx, transcript_rx) = unbounded();
        Self {
            config: SpeechCaptureConfig::default(),
            source: Arc::new(Mutex::new(Some(source))),
            recognizer,
            store: None,
            intake: None,
            transcript_tx,
            transcript_rx,
            token: ShutdownToken::new(),
            thread: None,
        }
    }

    /// Persist each recognized utterance through this store.
    pub fn with_store(mut self, store: TranscriptStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets capture configuration.
    pub fn with_config(mut self, config: SpeechCaptureConfig) -> Self {
        self.config = config;
        self
    }

    /// Wires the pipeline intake that receives each recognized utterance.
    pub fn set_intake(&mut self, intake: Intake) {
        self.intake = Some(intake);
    }

    /// Starts background capture and decoding.
    ///
    /// Starting an already-running capture is a no-op with a warning. A
    /// stopped capture can be started again; the audio source is handed back
    /// by the previous capture thread on exit.
    ///
    /// # Errors
    /// `AudioSourceBusy` if a previous capture thread was detached at stop
    /// and still holds the audio source.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            tracing::warn!("speech capture already running");
            return Ok(());
        }

        let mut source = self
            .source
            .lock()
            .map_err(|_| CallguardError::AudioCapture {
                message: "audio source lock poisoned".to_string(),
            })?
            .take()
            .ok_or(CallguardError::AudioSourceBusy)?;
        if let Err(e) = source.start() {
            if let Ok(mut slot) = self.source.lock() {
                *slot = Some(source);
            }
            return Err(e);
        }

        self.token = ShutdownToken::new();
        let worker = CaptureWorker {
            config: self.config.clone(),
            recognizer: Arc::clone(&self.recognizer),
            store: self.store.clone(),
            intake: self.intake.clone(),
            transcript_tx: self.transcript_tx.clone(),
            token: self.token.clone(),
            source_slot: Arc::clone(&self.source),
        };
        self.thread = Some(thread::spawn(move || worker.run(source)));

        tracing::info!(model = self.recognizer.model_name(), "speech capture started");
        Ok(())
    }

    /// Signals the capture loop to exit and waits up to the grace period.
    ///
    /// Safe to call on an already-stopped instance.
    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.thread.take() {
            join_with_grace(handle, self.config.grace_period, "speech capture");
            tracing::info!("speech capture stopped");
        }
    }

    /// Whether the capture thread is live.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Pull-based access to the transcript queue.
    ///
    /// * `block = false`: returns immediately with whatever is queued.
    /// * `block = true` with a timeout: waits up to that long.
    /// * `block = true` without a timeout: waits until a transcript arrives.
    ///   Stopping the capture does not wake the call; prefer a timeout when
    ///   the capture may be stopped concurrently.
    pub fn get_transcript(&self, block: bool, timeout: Option<Duration>) -> Option<String> {
        if !block {
            return self.transcript_rx.try_recv().ok();
        }
        match timeout {
            Some(limit) => self.transcript_rx.recv_timeout(limit).ok(),
            None => self.transcript_rx.recv().ok(),
        }
    }
}

/// State moved into the capture thread.
struct CaptureWorker {
    config: SpeechCaptureConfig,
    recognizer: Arc<dyn Recognizer>,
    store: Option<TranscriptStore>,
    intake: Option<Intake>,
    transcript_tx: Sender<String>,
    token: ShutdownToken,
    source_slot: SourceSlot,
}

impl CaptureWorker {
    fn run(self, mut source: Box<dyn AudioSource>) {
        let mut endpointer = Endpointer::new(self.config.endpointer);

        while !self.token.is_cancelled() {
            let samples = match source.read_samples() {
                Ok(samples) => samples,
                Err(e) => {
                    // Transient capture errors never kill the loop
                    tracing::warn!(error = %e, "audio read failed, backing off");
                    thread::sleep(self.config.error_backoff);
                    continue;
                }
            };

            if samples.is_empty() {
                thread::sleep(self.config.poll_interval);
                continue;
            }

            let Some(segment) = endpointer.push(&samples) else {
                thread::sleep(self.config.poll_interval);
                continue;
            };

            if calculate_rms(&segment) < defaults::MIN_ENERGY_FOR_RECOGNITION {
                continue;
            }

            match self.recognizer.recognize(&segment) {
                Ok(text) => self.emit(text),
                Err(e) => {
                    tracing::warn!(error = %e, "recognition failed, backing off");
                    thread::sleep(self.config.error_backoff);
                }
            }
        }

        // Release the microphone and hand the source back for a restart
        if let Err(e) = source.stop() {
            tracing::warn!(error = %e, "failed to stop audio source");
        }
        if let Ok(mut slot) = self.source_slot.lock() {
            *slot = Some(source);
        }
    }

    /// Fan a recognized utterance out to the queue, the store, and the intake.
    fn emit(&self, text: String) {
        tracing::info!(chars = text.len(), "utterance recognized");

        if let Some(store) = &self.store
            && let Err(e) = store.save_transcript(&text)
        {
            tracing::warn!(error = %e, "failed to save transcript");
        }

        let _ = self.transcript_tx.send(text.clone());

        if let Some(intake) = &self.intake {
            intake.submit(&text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::recorder::MockAudioSource;
    use crate::stt::recognizer::MockRecognizer;
    use crossbeam_channel::unbounded as channel;

    /// Capture config with millisecond-scale endpointing for fast tests.
    fn fast_config() -> SpeechCaptureConfig {
        SpeechCaptureConfig {
            endpointer: EndpointerConfig {
                speech_threshold: 0.02,
                silence_duration_ms: 20,
                min_speech_ms: 0,
            },
            poll_interval: Duration::from_millis(1),
            error_backoff: Duration::from_millis(5),
            grace_period: Duration::from_secs(2),
        }
    }

    /// A source scripted to produce one spoken segment then silence.
    fn one_utterance_source() -> MockAudioSource {
        let mut source = MockAudioSource::new();
        for _ in 0..5 {
            source = source.with_read(vec![8000; 320]);
        }
        for _ in 0..50 {
            source = source.with_read(vec![0; 320]);
        }
        source
    }

    #[test]
    fn test_capture_decodes_one_utterance_to_queue() {
        let recognizer = Arc::new(MockRecognizer::new("mock").with_response("hello there"));
        let mut capture = SpeechCapture::new(Box::new(one_utterance_source()), recognizer)
            .with_config(fast_config());

        capture.start().unwrap();
        let transcript = capture.get_transcript(true, Some(Duration::from_secs(2)));
        capture.stop();

        assert_eq!(transcript.as_deref(), Some("hello there"));
    }

    #[test]
    fn test_capture_persists_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path()).unwrap();
        let recognizer = Arc::new(MockRecognizer::new("mock").with_response("saved text"));
        let mut capture = SpeechCapture::new(Box::new(one_utterance_source()), recognizer)
            .with_store(store.clone())
            .with_config(fast_config());

        capture.start().unwrap();
        assert!(capture.get_transcript(true, Some(Duration::from_secs(2))).is_some());
        capture.stop();

        let files: Vec<_> = std::fs::read_dir(store.transcript_dir())
            .unwrap()
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_capture_forwards_to_intake() {
        let (tx, rx) = channel();
        let recognizer = Arc::new(MockRecognizer::new("mock").with_response("forwarded"));
        let mut capture = SpeechCapture::new(Box::new(one_utterance_source()), recognizer)
            .with_config(fast_config());
        capture.set_intake(Intake::new(tx));

        capture.start().unwrap();
        let utterance = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        capture.stop();

        assert_eq!(utterance.text, "forwarded");
    }

    #[test]
    fn test_double_start_is_noop_with_single_thread() {
        let (tx, rx) = channel();
        let recognizer = Arc::new(MockRecognizer::new("mock").with_response("only once"));
        let mut capture = SpeechCapture::new(Box::new(one_utterance_source()), recognizer)
            .with_config(fast_config());
        capture.set_intake(Intake::new(tx));

        capture.start().unwrap();
        capture.start().unwrap(); // no-op

        // Exactly one utterance comes through for the single spoken segment
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        capture.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let recognizer = Arc::new(MockRecognizer::new("mock"));
        let mut capture = SpeechCapture::new(Box::new(MockAudioSource::new()), recognizer)
            .with_config(fast_config());

        capture.start().unwrap();
        capture.stop();
        capture.stop(); // safe on an already-stopped instance
        assert!(!capture.is_running());
    }

    #[test]
    fn test_restart_after_stop() {
        let recognizer = Arc::new(MockRecognizer::new("mock"));
        let mut capture = SpeechCapture::new(Box::new(MockAudioSource::new()), recognizer)
            .with_config(fast_config());

        capture.start().unwrap();
        capture.stop();

        // The previous thread returned the source; a fresh start succeeds
        capture.start().unwrap();
        assert!(capture.is_running());
        capture.stop();
    }

    #[test]
    fn test_stop_returns_source_and_start_retakes_it() {
        let recognizer = Arc::new(MockRecognizer::new("mock").with_response("spoken"));
        let mut capture = SpeechCapture::new(Box::new(one_utterance_source()), recognizer)
            .with_config(fast_config());

        capture.start().unwrap();
        assert!(capture.source.lock().unwrap().is_none()); // held by the thread
        assert!(capture.get_transcript(true, Some(Duration::from_secs(2))).is_some());
        capture.stop();
        assert!(capture.source.lock().unwrap().is_some()); // handed back

        capture.start().unwrap();
        assert!(capture.source.lock().unwrap().is_none());
        capture.stop();
    }

    #[test]
    fn test_recognition_error_does_not_kill_loop() {
        // Recognizer always fails; the loop must stay alive until stopped.
        let recognizer = Arc::new(MockRecognizer::new("mock").with_failure());
        let mut capture = SpeechCapture::new(Box::new(one_utterance_source()), recognizer)
            .with_config(fast_config());

        capture.start().unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(capture.is_running());
        capture.stop();
    }

    #[test]
    fn test_get_transcript_nonblocking_on_empty_queue() {
        let recognizer = Arc::new(MockRecognizer::new("mock"));
        let capture = SpeechCapture::new(Box::new(MockAudioSource::new()), recognizer);
        assert!(capture.get_transcript(false, None).is_none());
    }

    #[test]
    fn test_get_transcript_timed_wait_after_stop() {
        let recognizer = Arc::new(MockRecognizer::new("mock"));
        let mut capture = SpeechCapture::new(Box::new(MockAudioSource::new()), recognizer)
            .with_config(fast_config());

        capture.start().unwrap();
        capture.stop();

        // Empty queue after stop: the timed wait elapses and returns None
        assert!(
            capture
                .get_transcript(true, Some(Duration::from_millis(50)))
                .is_none()
        );
    }
}
