use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::CachedClassifier;
use crate::classifier::{ClassifierKind, TextClassifier};
use crate::error::Result;
use crate::lexicon::LexiconClassifier;
use crate::modernbert::{ModernBertClassifier, DEFAULT_EMOTION_REPO, DEFAULT_SENTIMENT_REPO};

/// Which implementation backs the classifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Pretrained ModernBERT models from the Hugging Face hub
    #[default]
    Candle,
    /// Offline keyword matching
    Lexicon,
}

impl std::fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelBackend::Candle => write!(f, "candle"),
            ModelBackend::Lexicon => write!(f, "lexicon"),
        }
    }
}

impl std::str::FromStr for ModelBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "candle" | "modernbert" | "hub" => Ok(ModelBackend::Candle),
            "lexicon" | "offline" => Ok(ModelBackend::Lexicon),
            _ => Err(format!("Unknown model backend: {}", s)),
        }
    }
}

/// `[model]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    pub backend: ModelBackend,
    /// Hub repo id or local directory of the sentiment model
    pub sentiment_repo: String,
    /// Hub repo id or local directory of the emotion model
    pub emotion_repo: String,
    /// Number of texts whose scores are memoized per classifier (0 disables)
    pub cache_capacity: usize,
    /// Token limit per answer; defaults to the model's position limit
    pub max_length: Option<usize>,
    /// Upper bound on scoring one submission
    #[serde(with = "humantime_serde")]
    pub inference_timeout: Option<Duration>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            sentiment_repo: DEFAULT_SENTIMENT_REPO.to_string(),
            emotion_repo: DEFAULT_EMOTION_REPO.to_string(),
            cache_capacity: 256,
            max_length: None,
            inference_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// The sentiment and emotion classifier pair used for analysis.
#[derive(Clone)]
pub struct Classifiers {
    pub backend: ModelBackend,
    pub sentiment: Arc<dyn TextClassifier>,
    pub emotion: Arc<dyn TextClassifier>,
}

/// Build both classifiers for the configured backend.
///
/// With the candle backend this downloads model files on first use, so it
/// can take a while and should run on a blocking thread.
pub fn load_classifiers(settings: &ModelSettings) -> Result<Classifiers> {
    let (sentiment, emotion): (Arc<dyn TextClassifier>, Arc<dyn TextClassifier>) =
        match settings.backend {
            ModelBackend::Candle => (
                Arc::new(ModernBertClassifier::load(
                    &settings.sentiment_repo,
                    settings.max_length,
                )?),
                Arc::new(ModernBertClassifier::load(
                    &settings.emotion_repo,
                    settings.max_length,
                )?),
            ),
            ModelBackend::Lexicon => (
                Arc::new(LexiconClassifier::new(ClassifierKind::Sentiment)),
                Arc::new(LexiconClassifier::new(ClassifierKind::Emotion)),
            ),
        };

    info!(
        backend = %settings.backend,
        sentiment = sentiment.name(),
        emotion = emotion.name(),
        "Classifiers ready"
    );

    Ok(Classifiers {
        backend: settings.backend,
        sentiment: Arc::new(CachedClassifier::new(sentiment, settings.cache_capacity)),
        emotion: Arc::new(CachedClassifier::new(emotion, settings.cache_capacity)),
    })
}
