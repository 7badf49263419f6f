//! Whisper-based speech recognition.
//!
//! Implements the [`Recognizer`] trait using whisper-rs.
//!
//! # Feature Gate
//!
//! The real backend requires the `whisper` feature (and cmake to build).
//! Without it, `WhisperRecognizer` is a stub that errors on use.

use crate::defaults;
use crate::error::{CallguardError, Result};
use crate::stt::recognizer::Recognizer;
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper recognizer.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en"), or "auto" for detection
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::DEFAULT_RECOGNIZER_MODEL),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper-backed recognizer.
///
/// The WhisperContext is wrapped in a Mutex for thread safety.
#[cfg(feature = "whisper")]
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Stub recognizer used when the `whisper` feature is disabled.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperRecognizer {
    #[allow(dead_code)]
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperRecognizer {
    /// Create a new Whisper recognizer.
    ///
    /// # Errors
    /// Returns `RecognitionModelNotFound` if the model file doesn't exist,
    /// `Recognition` if loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(CallguardError::RecognitionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| CallguardError::Recognition {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| CallguardError::Recognition {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperRecognizer {
    /// Create a new Whisper recognizer (stub implementation).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(CallguardError::RecognitionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }
}

/// Extract a display name from the model file path.
fn model_name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Convert i16 audio samples to f32 normalized to [-1.0, 1.0].
///
/// Whisper expects f32 audio; input is 16-bit PCM (-32768..=32767).
pub fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

#[cfg(feature = "whisper")]
impl Recognizer for WhisperRecognizer {
    fn recognize(&self, audio: &[i16]) -> Result<String> {
        let audio_f32 = convert_audio(audio);

        let context = self
            .context
            .lock()
            .map_err(|e| CallguardError::Recognition {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| CallguardError::Recognition {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Keep whisper.cpp off our stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| CallguardError::Recognition {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl Recognizer for WhisperRecognizer {
    fn recognize(&self, _audio: &[i16]) -> Result<String> {
        Err(CallguardError::Recognition {
            message: "whisper feature not enabled; rebuild with --features whisper".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
