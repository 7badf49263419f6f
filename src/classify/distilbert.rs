//! DistilBERT spam classifier using candle.
//!
//! Downloads model artifacts from HuggingFace on first use, then runs a
//! single forward pass per prediction: fixed-length tokenization, CLS
//! pooling, a two-layer classification head, softmax over the two classes.

use crate::classify::classifier::{Classifier, Verdict, VerdictLabel};
use crate::config::{ClassifierConfig, DevicePlacement};
use crate::defaults;
use crate::error::{CallguardError, Result};

use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::ops::softmax;
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as ModelConfig, DistilBertModel};
use hf_hub::api::sync::Api;
use serde::Deserialize;
use std::sync::Mutex;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// The slice of the HF config the classification head needs.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    dim: usize,
}

/// DistilBERT binary classifier that runs inference via candle.
///
/// Weights are read-only after construction; the tokenizer sits behind a
/// Mutex because padding/truncation settings make it `&mut` to encode.
pub struct DistilBertClassifier {
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
    model_name: String,
}

impl DistilBertClassifier {
    /// Load the classification model from the HuggingFace cache.
    ///
    /// Downloads weights, config, and tokenizer on first call. Device
    /// placement is resolved here, once, and never reevaluated.
    ///
    /// # Errors
    /// Any failure here is construction-fatal for the owning process:
    /// the caller propagates it, no retry.
    pub fn load(config: &ClassifierConfig) -> Result<Self> {
        let device = resolve_device(config.device);
        tracing::info!(
            repo = %config.model_repo,
            device = ?device,
            "loading spam classification model"
        );

        let api = Api::new()
            .map_err(|e| CallguardError::ClassifierLoad {
                message: format!("HF Hub API init: {e}"),
            })?;
        let repo = api.model(config.model_repo.clone());

        let weights_path = repo.get("model.safetensors").map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Download model.safetensors: {e}"),
            }
        })?;
        let config_path = repo.get("config.json").map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Download config.json: {e}"),
            }
        })?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Download tokenizer.json: {e}"),
            }
        })?;

        let raw_config = std::fs::read_to_string(&config_path).map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Read config {}: {e}", config_path.display()),
            }
        })?;
        let model_config: ModelConfig = serde_json::from_str(&raw_config).map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Parse DistilBERT config: {e}"),
            }
        })?;
        let head_config: HeadConfig = serde_json::from_str(&raw_config).map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Parse DistilBERT config: {e}"),
            }
        })?;

        // SAFETY: the safetensors file comes from the HF cache and is not
        // mutated while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
        }
        .map_err(|e| CallguardError::ClassifierLoad {
            message: format!("Load safetensors: {e}"),
        })?;

        // Sequence-classification checkpoints nest the encoder under
        // "distilbert" with the head weights at the top level.
        let model = DistilBertModel::load(vb.pp("distilbert"), &model_config).map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Init DistilBERT encoder: {e}"),
            }
        })?;
        let pre_classifier =
            candle_nn::linear(head_config.dim, head_config.dim, vb.pp("pre_classifier")).map_err(
                |e| CallguardError::ClassifierLoad {
                    message: format!("Init pre_classifier head: {e}"),
                },
            )?;
        let classifier = candle_nn::linear(head_config.dim, 2, vb.pp("classifier")).map_err(
            |e| CallguardError::ClassifierLoad {
                message: format!("Init classifier head: {e}"),
            },
        )?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            CallguardError::ClassifierLoad {
                message: format!("Load tokenizer {}: {e}", tokenizer_path.display()),
            }
        })?;

        // Deterministic fixed-length input: truncate and pad to MAX_SEQ_LEN.
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(defaults::MAX_SEQ_LEN),
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: defaults::MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| CallguardError::ClassifierLoad {
                message: format!("Configure truncation: {e}"),
            })?;

        Ok(Self {
            model,
            pre_classifier,
            classifier,
            tokenizer: Mutex::new(tokenizer),
            device,
            model_name: config.model_repo.clone(),
        })
    }

    /// Run the forward pass and return softmax probabilities for
    /// [not-spam, spam].
    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = {
            let tokenizer = self
                .tokenizer
                .lock()
                .map_err(|e| CallguardError::Classification {
                    message: format!("Tokenizer lock poisoned: {e}"),
                })?;
            tokenizer
                .encode(text, true)
                .map_err(|e| CallguardError::Classification {
                    message: format!("Tokenize: {e}"),
                })?
        };

        let input_ids: Vec<u32> = encoding.get_ids().to_vec();
        // Candle's DistilBERT attention masks where the value is nonzero,
        // the inverse of the HF convention (1 = attend).
        let block_mask: Vec<u8> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| if m == 0 { 1u8 } else { 0u8 })
            .collect();
        let seq_len = input_ids.len();

        let input_tensor = Tensor::new(input_ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| CallguardError::Classification {
                message: format!("Create input tensor: {e}"),
            })?;
        let mask_tensor = Tensor::from_vec(block_mask, (1, 1, 1, seq_len), &self.device)
            .map_err(|e| CallguardError::Classification {
                message: format!("Create attention mask: {e}"),
            })?;

        let hidden = self
            .model
            .forward(&input_tensor, &mask_tensor)
            .map_err(|e| CallguardError::Classification {
                message: format!("Encoder forward: {e}"),
            })?;

        // CLS pooling, then the two-layer head
        let cls = hidden
            .i((.., 0))
            .map_err(|e| CallguardError::Classification {
                message: format!("CLS pooling: {e}"),
            })?;
        let pooled = self
            .pre_classifier
            .forward(&cls)
            .and_then(|t| t.relu())
            .map_err(|e| CallguardError::Classification {
                message: format!("Pre-classifier forward: {e}"),
            })?;
        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(|e| CallguardError::Classification {
                message: format!("Classifier forward: {e}"),
            })?;

        softmax(&logits, D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| CallguardError::Classification {
                message: format!("Softmax: {e}"),
            })
    }
}

impl Classifier for DistilBertClassifier {
    fn predict(&self, text: &str) -> Result<Verdict> {
        let probs = self.forward(text)?;
        if probs.len() != 2 {
            return Err(CallguardError::Classification {
                message: format!("expected 2 class scores, got {}", probs.len()),
            });
        }

        // argmax over the two classes; class 1 is spam
        let (label, confidence) = if probs[1] > probs[0] {
            (VerdictLabel::Spam, probs[1])
        } else {
            (VerdictLabel::NotSpam, probs[0])
        };

        Ok(Verdict::new(text.to_string(), label, confidence))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Resolve the configured device placement to a concrete candle device.
fn resolve_device(placement: DevicePlacement) -> Device {
    match placement {
        DevicePlacement::Cpu => Device::Cpu,
        DevicePlacement::Auto => Device::cuda_if_available(0).unwrap_or(Device::Cpu),
    }
}
