//! callguard - Real-time spam call detection
//!
//! Offline-first speech capture and transcription with DistilBERT spam
//! classification. Every utterance and verdict lands in a timestamped file.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod capture;
pub mod classify;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod shutdown;
pub mod store;
pub mod stt;

// Core traits (source → recognize → classify)
pub use audio::recorder::AudioSource;
pub use classify::{Classifier, Verdict, VerdictLabel};
pub use stt::recognizer::Recognizer;

// Pipeline
pub use capture::{SpeechCapture, SpeechCaptureConfig, Utterance};
pub use pipeline::{Intake, Pipeline, PipelineConfig};

// Persistence
pub use store::TranscriptStore;

// Error handling
pub use error::{CallguardError, Result};

// Config
pub use config::{Config, DevicePlacement};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
