//! Transcript and verdict persistence.
//!
//! Each recognized utterance and each classification verdict is written to
//! its own timestamp-named file under the configured save directory:
//!
//! - `<save_dir>/transcripts/transcript_<YYYYMMDD-HHMMSS>.txt`
//! - `<save_dir>/spam_results/result_<YYYYMMDD-HHMMSS>.txt`

use crate::classify::Verdict;
use crate::defaults;
use crate::error::{CallguardError, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes transcripts and verdicts to timestamped files.
///
/// Cheap to clone; both background threads hold one.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    transcript_dir: PathBuf,
    results_dir: PathBuf,
}

impl TranscriptStore {
    /// Create a store rooted at `save_dir`, creating the subdirectories if
    /// they don't exist.
    pub fn new(save_dir: &Path) -> Result<Self> {
        let transcript_dir = save_dir.join(defaults::TRANSCRIPT_DIR);
        let results_dir = save_dir.join(defaults::RESULTS_DIR);

        for dir in [save_dir, &transcript_dir, &results_dir] {
            fs::create_dir_all(dir)?;
        }

        Ok(Self {
            transcript_dir,
            results_dir,
        })
    }

    /// Persist a raw utterance transcript. Returns the file path.
    pub fn save_transcript(&self, text: &str) -> Result<PathBuf> {
        let timestamp = Local::now().format(defaults::FILE_TIMESTAMP_FORMAT);
        let path = self
            .transcript_dir
            .join(format!("transcript_{}.txt", timestamp));

        fs::write(&path, text).map_err(|e| CallguardError::Storage {
            kind: "transcript",
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "transcript saved");
        Ok(path)
    }

    /// Persist a classification verdict. Returns the file path.
    ///
    /// The file holds the four verdict fields in fixed order, confidence
    /// formatted to 4 decimal places.
    pub fn save_verdict(&self, verdict: &Verdict) -> Result<PathBuf> {
        let timestamp = Local::now().format(defaults::FILE_TIMESTAMP_FORMAT);
        let path = self.results_dir.join(format!("result_{}.txt", timestamp));

        let contents = format!(
            "Text: {}\nPrediction: {}\nConfidence: {:.4}\nTimestamp: {}\n",
            verdict.text,
            verdict.label,
            verdict.confidence,
            verdict.timestamp.format(defaults::VERDICT_TIMESTAMP_FORMAT),
        );

        fs::write(&path, contents).map_err(|e| CallguardError::Storage {
            kind: "verdict",
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "verdict saved");
        Ok(path)
    }

    /// Directory holding raw transcripts.
    pub fn transcript_dir(&self) -> &Path {
        &self.transcript_dir
    }

    /// Directory holding classification verdicts.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::VerdictLabel;

    #[test]
    fn test_new_creates_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path()).unwrap();

        assert!(store.transcript_dir().is_dir());
        assert!(store.results_dir().is_dir());
        assert!(store.transcript_dir().ends_with("transcripts"));
        assert!(store.results_dir().ends_with("spam_results"));
    }

    #[test]
    fn test_save_transcript_writes_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path()).unwrap();

        let path = store.save_transcript("hello from the microphone").unwrap();
        assert!(path.starts_with(store.transcript_dir()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("transcript_"));
        assert!(name.ends_with(".txt"));

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "hello from the microphone");
    }

    #[test]
    fn test_save_verdict_writes_four_fields_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path()).unwrap();

        let verdict = Verdict::new(
            "You have won a lottery".to_string(),
            VerdictLabel::Spam,
            0.98765,
        );
        let path = store.save_verdict(&verdict).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("result_"));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Text: You have won a lottery");
        assert_eq!(lines[1], "Prediction: Spam");
        assert_eq!(lines[2], "Confidence: 0.9877"); // 4 decimal places
        assert!(lines[3].starts_with("Timestamp: "));
    }

    #[test]
    fn test_save_verdict_not_spam_label() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path()).unwrap();

        let verdict = Verdict::new("dinner tonight?".to_string(), VerdictLabel::NotSpam, 0.91);
        let path = store.save_verdict(&verdict).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Prediction: Not Spam"));
    }
}
