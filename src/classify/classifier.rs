use crate::error::{CallguardError, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Binary classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictLabel {
    Spam,
    NotSpam,
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictLabel::Spam => write!(f, "Spam"),
            VerdictLabel::NotSpam => write!(f, "Not Spam"),
        }
    }
}

/// The classifier's structured output for one utterance.
///
/// Immutable once created; persisted by the transcript store.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// The source utterance text.
    pub text: String,
    /// The predicted label.
    pub label: VerdictLabel,
    /// Softmax probability mass on the chosen class, in [0, 1].
    pub confidence: f32,
    /// When the verdict was produced.
    pub timestamp: DateTime<Local>,
}

impl Verdict {
    /// Creates a verdict stamped with the current local time.
    pub fn new(text: String, label: VerdictLabel, confidence: f32) -> Self {
        Self {
            text,
            label,
            confidence,
            timestamp: Local::now(),
        }
    }

    /// Whether this verdict flagged the utterance as spam.
    ///
    /// Derived from the label, so the two can never disagree.
    pub fn is_spam(&self) -> bool {
        self.label == VerdictLabel::Spam
    }
}

/// Trait for spam/fraud text classification.
///
/// This trait allows swapping implementations (real DistilBERT vs mock).
/// `predict` is a pure function of (text, model weights); implementations
/// keep no mutable state between calls.
pub trait Classifier: Send + Sync {
    /// Classify the text, returning a structured verdict.
    fn predict(&self, text: &str) -> Result<Verdict>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;
}

/// Implement Classifier for Arc<T> to allow sharing across threads.
impl<T: Classifier> Classifier for Arc<T> {
    fn predict(&self, text: &str) -> Result<Verdict> {
        (**self).predict(text)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock classifier for testing.
///
/// Flags text containing any configured keyword as spam, and records every
/// predicted text in call order so tests can assert FIFO processing.
#[derive(Debug)]
pub struct MockClassifier {
    model_name: String,
    spam_keywords: Vec<String>,
    calls: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl MockClassifier {
    /// Create a mock classifier with a default keyword list.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            spam_keywords: vec!["lottery".to_string(), "claim now".to_string()],
            calls: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Replace the spam keyword list.
    pub fn with_spam_keywords(mut self, keywords: &[&str]) -> Self {
        self.spam_keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Configure the mock to fail on predict.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Handle to the recorded call log (texts in prediction order).
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl Classifier for MockClassifier {
    fn predict(&self, text: &str) -> Result<Verdict> {
        if self.should_fail {
            return Err(CallguardError::Classification {
                message: "mock classification failure".to_string(),
            });
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }

        let lower = text.to_lowercase();
        let is_spam = self.spam_keywords.iter().any(|k| lower.contains(k));
        let (label, confidence) = if is_spam {
            (VerdictLabel::Spam, 0.99)
        } else {
            (VerdictLabel::NotSpam, 0.87)
        };
        Ok(Verdict::new(text.to_string(), label, confidence))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
