//! ModernBERT sequence classifiers loaded from the Hugging Face hub.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{ops, VarBuilder};
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config, ModernBertForSequenceClassification,
};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::classifier::{sort_scores, LabelScore, TextClassifier};
use crate::error::{ModelError, Result};

pub const DEFAULT_SENTIMENT_REPO: &str = "clapAI/modernBERT-base-multilingual-sentiment";
pub const DEFAULT_EMOTION_REPO: &str = "cirimus/modernbert-base-go-emotions";

const FALLBACK_MAX_LENGTH: usize = 512;

/// How logits are turned into probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Single-label models: probabilities sum to one
    Softmax,
    /// Multi-label models: each label scored independently
    Sigmoid,
}

impl Activation {
    fn from_problem_type(problem_type: Option<&str>) -> Self {
        match problem_type {
            Some("multi_label_classification") => Activation::Sigmoid,
            _ => Activation::Softmax,
        }
    }
}

/// Classification head fields read from `config.json`.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    label2id: HashMap<String, u32>,
    #[serde(default)]
    problem_type: Option<String>,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

impl HeadConfig {
    fn labels(&self) -> Result<HashMap<u32, String>> {
        if !self.id2label.is_empty() {
            return self
                .id2label
                .iter()
                .map(|(id, label)| {
                    id.parse::<u32>()
                        .map(|id| (id, label.clone()))
                        .map_err(|_| ModelError::Config(format!("Invalid id2label key '{id}'")))
                })
                .collect();
        }

        if !self.label2id.is_empty() {
            return Ok(self
                .label2id
                .iter()
                .map(|(label, id)| (*id, label.clone()))
                .collect());
        }

        Err(ModelError::Config(
            "config.json has neither id2label nor label2id".to_string(),
        ))
    }
}

/// Local paths of the files a classifier needs.
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    /// Resolve files from a local directory, or download them from the hub.
    fn fetch(repo_id: &str) -> Result<Self> {
        let local = Path::new(repo_id);
        if local.is_dir() {
            debug!(dir = %local.display(), "Loading model files from local directory");
            let safetensors = local.join("model.safetensors");
            let weights = if safetensors.exists() {
                safetensors
            } else {
                local.join("pytorch_model.bin")
            };
            return Ok(Self {
                config: local.join("config.json"),
                tokenizer: local.join("tokenizer.json"),
                weights,
            });
        }

        let api = Api::new()?;
        let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));

        let config = repo.get("config.json")?;
        let tokenizer = repo.get("tokenizer.json")?;
        let weights = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))?;

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

/// A ModernBERT model with a sequence classification head.
pub struct ModernBertClassifier {
    name: String,
    model: ModernBertForSequenceClassification,
    tokenizer: Tokenizer,
    id2label: HashMap<u32, String>,
    activation: Activation,
    max_length: usize,
    device: Device,
}

impl ModernBertClassifier {
    /// Load a classifier from a hub repo id or a local directory.
    ///
    /// `max_length` caps the tokens fed to the model; defaults to the
    /// model's `max_position_embeddings`.
    pub fn load(repo_id: &str, max_length: Option<usize>) -> Result<Self> {
        let device = Device::Cpu;
        let files = ModelFiles::fetch(repo_id)?;

        let config_str = std::fs::read_to_string(&files.config)?;
        let mut config: Config = serde_json::from_str(&config_str)?;
        let head: HeadConfig = serde_json::from_str(&config_str)?;
        let id2label = head.labels()?;
        patch_classifier_config(&mut config, &id2label);

        let vb = if files.weights.extension().is_some_and(|e| e == "safetensors") {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)?
        };
        let model = ModernBertForSequenceClassification::load(vb, &config)?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(|e| {
            ModelError::Tokenization(format!(
                "Failed to load tokenizer from '{}': {}",
                files.tokenizer.display(),
                e
            ))
        })?;

        let activation = Activation::from_problem_type(head.problem_type.as_deref());
        let max_length = max_length
            .or(head.max_position_embeddings)
            .unwrap_or(FALLBACK_MAX_LENGTH);

        info!(
            repo = repo_id,
            labels = id2label.len(),
            ?activation,
            max_length,
            "Loaded classifier"
        );

        Ok(Self {
            name: repo_id.to_string(),
            model,
            tokenizer,
            id2label,
            activation,
            max_length,
            device,
        })
    }
}

impl TextClassifier for ModernBertClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            ModelError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                text.chars().take(50).collect::<String>(),
                e
            ))
        })?;

        let (ids, mask) = truncate_encoding(
            encoding.get_ids(),
            encoding.get_attention_mask(),
            self.max_length,
        );

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)?.unsqueeze(0)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        let probs = match self.activation {
            Activation::Softmax => ops::softmax(&logits, D::Minus1)?,
            Activation::Sigmoid => ops::sigmoid(&logits)?,
        };
        let probs = probs.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?;

        let mut scores = probs
            .iter()
            .enumerate()
            .map(|(id, score)| {
                self.id2label
                    .get(&(id as u32))
                    .map(|label| LabelScore::new(label.clone(), *score))
                    .ok_or_else(|| {
                        ModelError::Inference(format!(
                            "Model produced label id {} with no id2label entry",
                            id
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        sort_scores(&mut scores);

        Ok(scores)
    }
}

/// Make sure the classification head is sized for the labels in `config.json`.
fn patch_classifier_config(config: &mut Config, id2label: &HashMap<u32, String>) {
    let num_labels = id2label.len();
    let matches = config
        .classifier_config
        .as_ref()
        .map(|c| c.id2label.len() == num_labels)
        .unwrap_or(false);

    if matches {
        return;
    }

    let id2label: HashMap<String, String> = id2label
        .iter()
        .map(|(id, label)| (id.to_string(), label.clone()))
        .collect();
    let label2id: HashMap<String, String> = id2label
        .iter()
        .map(|(id, label)| (label.clone(), id.clone()))
        .collect();

    config.classifier_config = Some(ClassifierConfig {
        id2label,
        label2id,
        classifier_pooling: ClassifierPooling::default(),
    });
}

/// Cut an encoding down to `max_length` tokens, keeping the final special
/// token so the sequence stays well-formed.
fn truncate_encoding(ids: &[u32], mask: &[u32], max_length: usize) -> (Vec<u32>, Vec<u32>) {
    if ids.len() <= max_length || max_length < 2 {
        return (ids.to_vec(), mask.to_vec());
    }

    let mut ids_out = ids[..max_length - 1].to_vec();
    ids_out.push(ids[ids.len() - 1]);
    let mut mask_out = mask[..max_length - 1].to_vec();
    mask_out.push(mask[mask.len() - 1]);

    (ids_out, mask_out)
}
