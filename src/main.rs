//! callguard binary: microphone → transcription → spam verdicts on disk.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use callguard::audio::endpoint::EndpointerConfig;
use callguard::capture::{SpeechCapture, SpeechCaptureConfig};
use callguard::classify::DistilBertClassifier;
use callguard::config::Config;
use callguard::pipeline::Pipeline;
use callguard::store::TranscriptStore;
use callguard::{defaults, logging, output, version_string};

const CONFIG_PATH: &str = "callguard.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default(Path::new(CONFIG_PATH))
        .with_context(|| format!("failed to load {CONFIG_PATH}"))?;

    logging::init(&config.storage.log_file)?;
    tracing::info!(
        version = %version_string(),
        backend = defaults::gpu_backend(),
        "callguard starting"
    );

    let mut pipeline = build_pipeline(&config)?;
    pipeline.start().context("failed to start pipeline")?;
    output::print_startup_banner();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    tracing::info!("interrupt received");

    pipeline.stop();
    output::print_shutdown_notice();
    Ok(())
}

#[cfg(all(feature = "cpal-audio", feature = "whisper"))]
fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    use callguard::audio::capture::CpalAudioSource;
    use callguard::stt::whisper::{WhisperConfig, WhisperRecognizer};

    let store =
        TranscriptStore::new(&config.storage.save_dir).context("failed to create save dirs")?;

    let classifier = DistilBertClassifier::load(&config.classifier)
        .context("failed to load spam classification model")?;

    let source = CpalAudioSource::new(config.audio.device.as_deref())
        .context("failed to open audio input")?;

    let recognizer = WhisperRecognizer::new(WhisperConfig {
        model_path: config.recognizer.model_path.clone(),
        language: config.recognizer.language.clone(),
        threads: None,
    })
    .context("failed to load speech recognition model")?;

    let capture_config = SpeechCaptureConfig {
        endpointer: EndpointerConfig {
            speech_threshold: config.audio.vad_threshold,
            silence_duration_ms: config.audio.silence_duration_ms,
            ..EndpointerConfig::default()
        },
        ..SpeechCaptureConfig::default()
    };

    let capture = SpeechCapture::new(Box::new(source), Arc::new(recognizer))
        .with_store(store.clone())
        .with_config(capture_config);

    Ok(Pipeline::new(capture, Arc::new(classifier), store))
}

#[cfg(not(all(feature = "cpal-audio", feature = "whisper")))]
fn build_pipeline(_config: &Config) -> anyhow::Result<Pipeline> {
    anyhow::bail!("callguard was built without the cpal-audio and whisper features")
}
