use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub recognizer: RecognizerConfig,
    pub classifier: ClassifierConfig,
    pub storage: StorageConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub vad_threshold: f32,
    pub silence_duration_ms: u32,
}

/// Speech recognizer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognizerConfig {
    pub model_path: PathBuf,
    pub language: String,
}

/// Spam classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// HuggingFace repository id for the classification model
    pub model_repo: String,
    /// Compute device placement, resolved once at construction
    pub device: DevicePlacement,
}

/// Compute device placement for classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlacement {
    /// Always run on CPU
    Cpu,
    /// Use an accelerator when one is available, CPU otherwise
    Auto,
}

/// Transcript and verdict persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub save_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            vad_threshold: defaults::VAD_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::DEFAULT_RECOGNIZER_MODEL),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_repo: defaults::SPAM_MODEL_REPO.to_string(),
            device: DevicePlacement::Auto,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(defaults::DEFAULT_SAVE_DIR),
            log_file: PathBuf::from(defaults::DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file is missing.
    ///
    /// Invalid TOML is still an error; only a missing file falls back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.device, None);
        assert_eq!(config.recognizer.language, "en");
        assert_eq!(config.classifier.device, DevicePlacement::Auto);
        assert_eq!(config.storage.save_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[classifier]\ndevice = \"cpu\"\n\n[storage]\nsave_dir = \"/tmp/screening\"\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.classifier.device, DevicePlacement::Cpu);
        assert_eq!(config.storage.save_dir, PathBuf::from("/tmp/screening"));
        // Untouched sections fall back to defaults
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.classifier.model_repo, defaults::SPAM_MODEL_REPO);
    }

    #[test]
    fn test_load_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audio = not valid").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/callguard.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_device_placement_roundtrip() {
        let toml_str = "model_repo = \"x/y\"\ndevice = \"auto\"";
        let cfg: ClassifierConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.device, DevicePlacement::Auto);
        assert_eq!(cfg.model_repo, "x/y");
    }
}
