//! Default configuration constants shared across the crate.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default Voice Activity Detection (VAD) threshold.
///
/// RMS-based threshold (0.0 to 1.0) that decides when audio counts as speech.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Default silence duration in milliseconds before an utterance is considered ended.
pub const SILENCE_DURATION_MS: u32 = 1500;

/// Minimum speech duration in milliseconds for a segment to be decoded.
///
/// Shorter bursts are clicks or breath noise, not utterances.
pub const MIN_SPEECH_MS: u32 = 300;

/// Minimum RMS energy for a segment to be worth decoding.
///
/// Segments below this are silence/ambient noise — skip the recognizer entirely.
pub const MIN_ENERGY_FOR_RECOGNITION: f32 = 0.001;

/// Interval between reads of the audio source, in milliseconds (~60Hz).
pub const AUDIO_POLL_INTERVAL_MS: u64 = 16;

/// Backoff pause after a capture or decode error, in milliseconds.
pub const CAPTURE_BACKOFF_MS: u64 = 1000;

/// How long the classification worker waits for a pending utterance before
/// re-checking the shutdown token, in milliseconds.
pub const WORKER_RECV_TIMEOUT_MS: u64 = 100;

/// Grace period for a background thread to exit on stop, in seconds.
///
/// After this deadline the thread is detached; it dies with the process.
pub const STOP_GRACE_SECS: u64 = 2;

/// Default Whisper model path for speech recognition.
pub const DEFAULT_RECOGNIZER_MODEL: &str = "models/ggml-base.en.bin";

/// Default language code for recognition.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// HuggingFace repository for the spam classification model.
pub const SPAM_MODEL_REPO: &str = "AventIQ-AI/distilbert-spam-detection";

/// Maximum token sequence length for classification input.
///
/// Inputs are truncated or padded to exactly this length.
pub const MAX_SEQ_LEN: usize = 128;

/// Default directory for saved transcripts and verdicts.
pub const DEFAULT_SAVE_DIR: &str = "results";

/// Subdirectory of the save dir holding raw transcripts.
pub const TRANSCRIPT_DIR: &str = "transcripts";

/// Subdirectory of the save dir holding classification verdicts.
pub const RESULTS_DIR: &str = "spam_results";

/// Default log file path.
pub const DEFAULT_LOG_FILE: &str = "spam_detection_system.log";

/// Timestamp format used in transcript and result filenames.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Timestamp format used inside verdict files.
pub const VERDICT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Report the GPU backend compiled into this build.
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") { "CUDA" } else { "CPU" }
}
