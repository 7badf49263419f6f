//! Pipeline orchestration: intake, classification worker, lifecycle.
//!
//! Owns the FIFO queue of pending utterances (a single-consumer channel),
//! the worker thread that drains it through the classifier, and start/stop
//! for the whole system. State machine: stopped → running → stopped.

use crate::capture::{SpeechCapture, Utterance};
use crate::classify::Classifier;
use crate::defaults;
use crate::error::Result;
use crate::output::{AlertSink, ConsoleAlert};
use crate::shutdown::{ShutdownToken, join_with_grace};
use crate::store::TranscriptStore;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The intake boundary: validates an utterance and enqueues it.
///
/// Blank or whitespace-only text is discarded with a warning and never
/// reaches the classifier. Cloneable; the capture thread holds one.
#[derive(Debug, Clone)]
pub struct Intake {
    tx: Sender<Utterance>,
}

impl Intake {
    /// Wraps a pending-queue sender.
    pub fn new(tx: Sender<Utterance>) -> Self {
        Self { tx }
    }

    /// Validates and enqueues text. Returns whether it was accepted.
    pub fn submit(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            tracing::warn!("empty utterance received, skipping");
            return false;
        }

        tracing::info!(text = %preview(text), "queueing utterance");
        if self.tx.send(Utterance::new(text.to_string())).is_err() {
            tracing::warn!("pending queue closed, utterance dropped");
            return false;
        }
        true
    }

    /// Number of utterances currently pending.
    pub fn pending_len(&self) -> usize {
        self.tx.len()
    }
}

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long the worker waits for a pending utterance before re-checking
    /// the shutdown token
    pub recv_timeout: Duration,
    /// Bounded wait for the worker to exit on stop
    pub grace_period: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recv_timeout: Duration::from_millis(defaults::WORKER_RECV_TIMEOUT_MS),
            grace_period: Duration::from_secs(defaults::STOP_GRACE_SECS),
        }
    }
}

/// The speech-to-verdict pipeline.
///
/// Wires speech capture into the pending queue and runs the classification
/// worker. Unprocessed utterances are dropped at stop — best-effort by
/// design, no durability guarantee.
pub struct Pipeline {
    config: PipelineConfig,
    capture: SpeechCapture,
    classifier: Arc<dyn Classifier>,
    store: TranscriptStore,
    alert_sink: Arc<dyn AlertSink>,
    intake: Intake,
    pending_rx: Option<Receiver<Utterance>>,
    token: ShutdownToken,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Builds the pipeline and wires the capture's output into the intake.
    pub fn new(
        mut capture: SpeechCapture,
        classifier: Arc<dyn Classifier>,
        store: TranscriptStore,
    ) -> Self {
        let (tx, rx) = unbounded();
        let intake = Intake::new(tx);
        capture.set_intake(intake.clone());

        Self {
            config: PipelineConfig::default(),
            capture,
            classifier,
            store,
            alert_sink: Arc::new(ConsoleAlert),
            intake,
            pending_rx: Some(rx),
            token: ShutdownToken::new(),
            worker: None,
        }
    }

    /// Sets pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets a custom alert sink (console by default).
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = sink;
        self
    }

    /// A handle to the intake boundary, for submitting text directly.
    ///
    /// The handle is tied to the queue of the current run; re-fetch it after
    /// a restart.
    pub fn intake(&self) -> Intake {
        self.intake.clone()
    }

    /// Whether the worker thread is live.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the worker and speech capture. Non-blocking.
    ///
    /// Starting an already-running pipeline is a no-op with a warning. A
    /// stopped pipeline can be started again; it begins with an empty queue,
    /// since the previous worker took the old one with it.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            tracing::warn!("system already running");
            return Ok(());
        }

        let pending_rx = match self.pending_rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = unbounded();
                self.intake = Intake::new(tx);
                self.capture.set_intake(self.intake.clone());
                rx
            }
        };

        self.token = ShutdownToken::new();
        let worker = ClassifyWorker {
            classifier: Arc::clone(&self.classifier),
            store: self.store.clone(),
            alert_sink: Arc::clone(&self.alert_sink),
            token: self.token.clone(),
            recv_timeout: self.config.recv_timeout,
        };
        self.worker = Some(thread::spawn(move || worker.run(pending_rx)));

        self.capture.start()?;

        tracing::info!("system started");
        Ok(())
    }

    /// Stops capture first, then the worker. Idempotent.
    ///
    /// Utterances still queued are dropped without classification.
    pub fn stop(&mut self) {
        tracing::info!("stopping system");

        self.capture.stop();

        self.token.cancel();
        if let Some(handle) = self.worker.take() {
            join_with_grace(handle, self.config.grace_period, "classification worker");
        }

        tracing::info!("system stopped");
    }
}

/// State moved into the worker thread.
struct ClassifyWorker {
    classifier: Arc<dyn Classifier>,
    store: TranscriptStore,
    alert_sink: Arc<dyn AlertSink>,
    token: ShutdownToken,
    recv_timeout: Duration,
}

impl ClassifyWorker {
    fn run(self, pending_rx: Receiver<Utterance>) {
        loop {
            if self.token.is_cancelled() {
                break;
            }

            let utterance = match pending_rx.recv_timeout(self.recv_timeout) {
                Ok(utterance) => utterance,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            self.process(&utterance);
        }
    }

    /// Classify, persist, alert. Errors drop the item and keep the loop alive.
    fn process(&self, utterance: &Utterance) {
        tracing::info!(text = %preview(&utterance.text), "detecting spam");

        let verdict = match self.classifier.predict(&utterance.text) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!(error = %e, "error processing text");
                return;
            }
        };

        tracing::info!(
            prediction = %verdict.label,
            confidence = format!("{:.4}", verdict.confidence),
            "classification complete"
        );

        // No alert for a verdict that was never persisted
        if let Err(e) = self.store.save_verdict(&verdict) {
            tracing::error!(error = %e, "failed to save result");
            return;
        }

        if verdict.is_spam() {
            tracing::warn!("spam detected");
            self.alert_sink.spam_alert(&verdict);
        }
    }
}

/// Truncate text to a short prefix for log lines.
fn preview(text: &str) -> String {
    const MAX: usize = 50;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}...")
    }
}
