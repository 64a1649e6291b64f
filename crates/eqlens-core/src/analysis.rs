use std::collections::BTreeMap;
use std::sync::Arc;

use eqlens_model::{Classifiers, ModelError, TextClassifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sentiment as used for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Map a raw model label onto the three scoring labels.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "POSITIVE" | "POS" => SentimentLabel::Positive,
            "NEGATIVE" | "NEG" => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model output for a single answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
    pub emotion_scores: BTreeMap<String, f64>,
    pub primary_emotion: Option<String>,
    pub primary_emotion_score: f64,
}

impl ResponseAnalysis {
    pub fn new(
        sentiment_label: SentimentLabel,
        sentiment_score: f64,
        emotion_scores: BTreeMap<String, f64>,
    ) -> Self {
        let (primary_emotion, primary_emotion_score) = primary(&emotion_scores);
        Self {
            sentiment_label,
            sentiment_score,
            emotion_scores,
            primary_emotion,
            primary_emotion_score,
        }
    }
}

fn primary(scores: &BTreeMap<String, f64>) -> (Option<String>, f64) {
    let mut best: Option<(&String, f64)> = None;
    for (label, &score) in scores {
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((label, score));
        }
    }
    match best {
        Some((label, score)) => (Some(label.clone()), score),
        None => (None, 0.0),
    }
}

/// Result of analyzing one answer, including a swallowed emotion failure.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: ResponseAnalysis,
    pub emotion_error: Option<String>,
}

/// Runs answers through the sentiment and emotion classifiers.
#[derive(Clone)]
pub struct Analyzer {
    sentiment: Arc<dyn TextClassifier>,
    emotion: Arc<dyn TextClassifier>,
}

impl Analyzer {
    pub fn new(sentiment: Arc<dyn TextClassifier>, emotion: Arc<dyn TextClassifier>) -> Self {
        Self { sentiment, emotion }
    }

    pub fn from_classifiers(classifiers: &Classifiers) -> Self {
        Self::new(classifiers.sentiment.clone(), classifiers.emotion.clone())
    }

    /// Analyze one answer. Sentiment failures are errors; emotion failures
    /// are reported in the outcome and leave the emotion map empty.
    pub fn analyze_detailed(&self, text: &str) -> Result<AnalysisOutcome, ModelError> {
        let (sentiment_label, sentiment_score) = match self.sentiment.top(text)? {
            Some(top) => (SentimentLabel::normalize(&top.label), top.score as f64),
            None => (SentimentLabel::Neutral, 0.5),
        };

        let (emotion_scores, emotion_error) = match self.emotion.classify(text) {
            Ok(scores) => {
                let map = scores
                    .into_iter()
                    .filter_map(|s| {
                        let label = s.label.trim().to_lowercase();
                        (!label.is_empty()).then_some((label, s.score as f64))
                    })
                    .collect();
                (map, None)
            }
            Err(e) => {
                warn!(classifier = self.emotion.name(), error = %e, "Emotion analysis failed");
                (BTreeMap::new(), Some(e.to_string()))
            }
        };

        let analysis = ResponseAnalysis::new(sentiment_label, sentiment_score, emotion_scores);
        debug!(
            sentiment = %analysis.sentiment_label,
            score = analysis.sentiment_score,
            primary_emotion = ?analysis.primary_emotion,
            "Analyzed response"
        );

        Ok(AnalysisOutcome {
            analysis,
            emotion_error,
        })
    }

    pub fn analyze(&self, text: &str) -> Result<ResponseAnalysis, ModelError> {
        Ok(self.analyze_detailed(text)?.analysis)
    }

    pub fn analyze_responses(&self, answers: &[String]) -> Result<Vec<ResponseAnalysis>, ModelError> {
        answers.iter().map(|a| self.analyze(a)).collect()
    }
}
