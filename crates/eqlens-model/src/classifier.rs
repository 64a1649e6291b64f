use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single label with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// What a classifier predicts. Used to pick lexicons and default repos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    Sentiment,
    Emotion,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierKind::Sentiment => write!(f, "sentiment"),
            ClassifierKind::Emotion => write!(f, "emotion"),
        }
    }
}

/// The core abstraction over pretrained text classifiers.
///
/// Implementations are blocking and may be expensive; async callers should
/// run them on a blocking thread.
pub trait TextClassifier: Send + Sync {
    /// Human-readable name (model repo or backend name)
    fn name(&self) -> &str;

    /// Score every label for `text`, highest score first.
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;

    /// Only the highest-scoring label, if the model returned any.
    fn top(&self, text: &str) -> Result<Option<LabelScore>> {
        Ok(self.classify(text)?.into_iter().next())
    }
}

/// Sort label scores highest first, breaking ties by label.
pub(crate) fn sort_scores(scores: &mut [LabelScore]) {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
}
