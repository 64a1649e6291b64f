//! Offline keyword classifier.
//!
//! Scores text by counting words that start with a known stem. It needs no
//! downloads, which makes it the backend for demos, development, and tests.

use crate::classifier::{sort_scores, ClassifierKind, LabelScore, TextClassifier};
use crate::error::Result;

type Lexicon = &'static [(&'static str, &'static [&'static str])];

const SENTIMENT_LEXICON: Lexicon = &[
    (
        "positive",
        &[
            "calm", "grateful", "happy", "hope", "glad", "good", "great", "confiden", "learn",
            "grow", "understand", "appreciat", "support", "respect", "constructive", "listen",
            "resolv", "improv", "positive", "optimis", "patien", "kind", "trust", "thank",
        ],
    ),
    (
        "negative",
        &[
            "angry", "anger", "upset", "frustrat", "hurt", "unfair", "annoy", "anxious", "stress",
            "embarrass", "humiliat", "hate", "terrible", "awful", "bad", "afraid", "scared",
            "worr", "defensive", "sad", "resent", "disappoint", "overwhelm", "fail",
        ],
    ),
];

const EMOTION_LEXICON: Lexicon = &[
    (
        "joy",
        &["happy", "glad", "joy", "excit", "proud", "relie", "delight", "cheer", "pleas"],
    ),
    (
        "sadness",
        &["sad", "disappoint", "hurt", "lonely", "regret", "discourag", "down", "cry"],
    ),
    (
        "anger",
        &["angry", "anger", "furious", "annoy", "frustrat", "irritat", "outrag", "resent"],
    ),
    (
        "fear",
        &["afraid", "scared", "fear", "anxious", "nervous", "worr", "panic", "threat"],
    ),
    (
        "disgust",
        &["disgust", "gross", "revolt", "sick of", "contempt", "appall"],
    ),
    (
        "surprise",
        &["surpris", "shock", "unexpect", "astonish", "sudden", "amaz"],
    ),
    (
        "love",
        &["love", "care", "compassion", "empath", "warm", "kind", "appreciat", "grateful"],
    ),
    (
        "neutral",
        &["think", "consider", "plan", "explain", "discuss", "question", "approach"],
    ),
];

/// Weight given to every label before any word matches.
const PRIOR: f32 = 0.1;
/// Extra weight for the label a text falls back to when nothing matches.
const FALLBACK_PRIOR: f32 = 1.0;

/// Keyword-stem classifier for sentiment or emotion labels.
pub struct LexiconClassifier {
    name: String,
    lexicon: Lexicon,
    fallback: &'static str,
}

impl LexiconClassifier {
    pub fn new(kind: ClassifierKind) -> Self {
        let (lexicon, fallback) = match kind {
            ClassifierKind::Sentiment => (SENTIMENT_LEXICON, "neutral"),
            ClassifierKind::Emotion => (EMOTION_LEXICON, "neutral"),
        };

        Self {
            name: format!("lexicon-{kind}"),
            lexicon,
            fallback,
        }
    }

    fn hits(&self, text: &str, stems: &[&str]) -> usize {
        let lowered = text.to_lowercase();
        let phrase_hits = stems
            .iter()
            .filter(|s| s.contains(' ') && lowered.contains(*s))
            .count();

        let word_hits = lowered
            .split(|c: char| !c.is_alphabetic() && c != '\'')
            .filter(|w| !w.is_empty())
            .filter(|w| stems.iter().any(|s| !s.contains(' ') && w.starts_with(s)))
            .count();

        phrase_hits + word_hits
    }
}

impl TextClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let mut weights: Vec<(&str, f32)> = self
            .lexicon
            .iter()
            .map(|(label, stems)| (*label, self.hits(text, stems) as f32 + PRIOR))
            .collect();

        match weights.iter_mut().find(|(label, _)| *label == self.fallback) {
            Some((_, weight)) => *weight += FALLBACK_PRIOR,
            None => weights.push((self.fallback, FALLBACK_PRIOR + PRIOR)),
        }

        let total: f32 = weights.iter().map(|(_, w)| w).sum();
        let mut scores: Vec<LabelScore> = weights
            .into_iter()
            .map(|(label, w)| LabelScore::new(label, w / total))
            .collect();
        sort_scores(&mut scores);

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_positive_text() {
        let classifier = LexiconClassifier::new(ClassifierKind::Sentiment);
        let top = classifier
            .top("I would stay calm, listen carefully and feel grateful for the feedback")
            .unwrap()
            .unwrap();
        assert_eq!(top.label, "positive");
    }

    #[test]
    fn test_sentiment_negative_text() {
        let classifier = LexiconClassifier::new(ClassifierKind::Sentiment);
        let top = classifier
            .top("I would be angry, upset and frustrated, it feels so unfair")
            .unwrap()
            .unwrap();
        assert_eq!(top.label, "negative");
    }

    #[test]
    fn test_sentiment_without_matches_is_neutral() {
        let classifier = LexiconClassifier::new(ClassifierKind::Sentiment);
        let top = classifier.top("the table is made of wood").unwrap().unwrap();
        assert_eq!(top.label, "neutral");
    }

    #[test]
    fn test_emotion_scores_cover_all_labels_and_sum_to_one() {
        let classifier = LexiconClassifier::new(ClassifierKind::Emotion);
        let scores = classifier
            .classify("I would feel angry and a little scared, but I care about them")
            .unwrap();

        assert_eq!(scores.len(), EMOTION_LEXICON.len());
        let total: f32 = scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_emotion_phrase_stems_match() {
        let classifier = LexiconClassifier::new(ClassifierKind::Emotion);
        let scores = classifier
            .classify("Honestly I am sick of it, the whole thing is gross and appalling")
            .unwrap();
        assert_eq!(scores[0].label, "disgust");
    }

    #[test]
    fn test_name_reflects_kind() {
        assert_eq!(
            LexiconClassifier::new(ClassifierKind::Emotion).name(),
            "lexicon-emotion"
        );
    }
}
