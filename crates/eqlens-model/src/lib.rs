//! # eqlens-model
//!
//! Pretrained text classification for eqlens.
//!
//! ## Key Types
//!
//! - [`TextClassifier`] - Abstraction over a classifier that scores every label
//! - [`ModernBertClassifier`] - ModernBERT sequence classifier run with candle
//! - [`LexiconClassifier`] - Offline keyword classifier
//! - [`CachedClassifier`] - Memoizes results by text hash
//!
//! Use [`load_classifiers`] to build the sentiment/emotion pair described by
//! [`ModelSettings`].

mod cache;
mod classifier;
mod error;
mod lexicon;
mod modernbert;
mod settings;

pub use cache::{AnalysisCache, CachedClassifier};
pub use classifier::{ClassifierKind, LabelScore, TextClassifier};
pub use error::{ModelError, Result};
pub use lexicon::LexiconClassifier;
pub use modernbert::{
    Activation, ModernBertClassifier, DEFAULT_EMOTION_REPO, DEFAULT_SENTIMENT_REPO,
};
pub use settings::{load_classifiers, Classifiers, ModelBackend, ModelSettings};
