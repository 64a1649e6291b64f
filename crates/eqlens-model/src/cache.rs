//! Memoization of classifier output keyed by a hash of the input text.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::classifier::{LabelScore, TextClassifier};
use crate::error::Result;

/// Bounded text → scores map. Oldest entries are evicted first.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    capacity: usize,
    entries: HashMap<String, Vec<LabelScore>>,
    order: VecDeque<String>,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn key(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<&Vec<LabelScore>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, scores: Vec<LabelScore>) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.contains_key(&key) {
            self.entries.insert(key, scores);
            return;
        }

        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, scores);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A classifier wrapper that answers repeated texts from an [`AnalysisCache`].
pub struct CachedClassifier {
    inner: Arc<dyn TextClassifier>,
    cache: Mutex<AnalysisCache>,
}

impl CachedClassifier {
    pub fn new(inner: Arc<dyn TextClassifier>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(AnalysisCache::new(capacity)),
        }
    }
}

impl TextClassifier for CachedClassifier {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let key = AnalysisCache::key(text);

        if let Ok(cache) = self.cache.lock() {
            if let Some(scores) = cache.get(&key) {
                trace!(classifier = self.inner.name(), "Cache hit");
                return Ok(scores.clone());
            }
        }

        // Run the model without holding the lock
        let scores = self.inner.classify(text)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, scores.clone());
        }

        Ok(scores)
    }
}
