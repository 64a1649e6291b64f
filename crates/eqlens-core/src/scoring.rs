use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{ResponseAnalysis, SentimentLabel};
use crate::demographics::Demographics;

/// Category names, in report order.
pub const CATEGORIES: [&str; 6] = [
    "self_awareness",
    "emotional_resilience",
    "conflict_resolution",
    "cultural_awareness",
    "empathy",
    "stress_management",
];

/// Per-category EQ scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryScores {
    pub self_awareness: f64,
    pub emotional_resilience: f64,
    pub conflict_resolution: f64,
    pub cultural_awareness: f64,
    pub empathy: f64,
    pub stress_management: f64,
}

impl CategoryScores {
    /// `(name, score)` pairs in [`CATEGORIES`] order
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            (CATEGORIES[0], self.self_awareness),
            (CATEGORIES[1], self.emotional_resilience),
            (CATEGORIES[2], self.conflict_resolution),
            (CATEGORIES[3], self.cultural_awareness),
            (CATEGORIES[4], self.empathy),
            (CATEGORIES[5], self.stress_management),
        ]
    }

    pub fn mean(&self) -> f64 {
        let entries = self.entries();
        entries.iter().map(|(_, v)| v).sum::<f64>() / entries.len() as f64
    }

    fn clamped(self) -> Self {
        let clamp = |v: f64| v.clamp(0.0, 100.0);
        Self {
            self_awareness: clamp(self.self_awareness),
            emotional_resilience: clamp(self.emotional_resilience),
            conflict_resolution: clamp(self.conflict_resolution),
            cultural_awareness: clamp(self.cultural_awareness),
            empathy: clamp(self.empathy),
            stress_management: clamp(self.stress_management),
        }
    }
}

/// Overall EQ band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqLevel {
    #[serde(rename = "Low EQ")]
    Low,
    #[serde(rename = "Average EQ")]
    Average,
    #[serde(rename = "High EQ")]
    High,
}

impl EqLevel {
    pub const ALL: [EqLevel; 3] = [EqLevel::Low, EqLevel::Average, EqLevel::High];

    /// Below 40 is low, 40 through 70 inclusive is average, above is high.
    pub fn from_score(overall: f64) -> Self {
        if overall < 40.0 {
            EqLevel::Low
        } else if overall <= 70.0 {
            EqLevel::Average
        } else {
            EqLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EqLevel::Low => "Low EQ",
            EqLevel::Average => "Average EQ",
            EqLevel::High => "High EQ",
        }
    }
}

impl std::fmt::Display for EqLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EqLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "low eq" => Ok(EqLevel::Low),
            "average" | "average eq" => Ok(EqLevel::Average),
            "high" | "high eq" => Ok(EqLevel::High),
            _ => Err(format!("Unknown EQ level: {}", s)),
        }
    }
}

/// Summed emotion scores per label across all analyses.
pub(crate) fn emotion_totals(analyses: &[ResponseAnalysis]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for analysis in analyses {
        for (label, score) in &analysis.emotion_scores {
            *totals.entry(label.clone()).or_insert(0.0) += score;
        }
    }
    totals
}

/// Summed sentiment scores per label.
pub(crate) fn sentiment_totals(analyses: &[ResponseAnalysis]) -> (f64, f64, f64) {
    analyses
        .iter()
        .fold((0.0, 0.0, 0.0), |(pos, neg, neu), a| match a.sentiment_label {
            SentimentLabel::Positive => (pos + a.sentiment_score, neg, neu),
            SentimentLabel::Negative => (pos, neg + a.sentiment_score, neu),
            SentimentLabel::Neutral => (pos, neg, neu + a.sentiment_score),
        })
}

struct SentimentRatios {
    positive: f64,
    negative: f64,
    neutral: f64,
}

fn sentiment_ratios(analyses: &[ResponseAnalysis]) -> SentimentRatios {
    if analyses.is_empty() {
        return SentimentRatios {
            positive: 0.33,
            negative: 0.33,
            neutral: 0.33,
        };
    }

    let (pos, neg, neu) = sentiment_totals(analyses);
    let count = analyses.len() as f64;
    SentimentRatios {
        positive: pos / count,
        negative: neg / count,
        neutral: neu / count,
    }
}

fn emotion_ratios(analyses: &[ResponseAnalysis]) -> BTreeMap<String, f64> {
    let totals = emotion_totals(analyses);
    let grand_total: f64 = totals.values().sum();
    let n = totals.len() as f64;

    totals
        .into_iter()
        .map(|(label, total)| {
            let ratio = if grand_total > 0.0 {
                total / grand_total
            } else {
                1.0 / n
            };
            (label, ratio)
        })
        .collect()
}

/// Turn per-answer analyses into category scores and an overall score.
///
/// Each category starts at 50 and moves by up to 50 with the sentiment and
/// emotion mix; older respondents get a small resilience and stress bonus.
pub fn calculate_eq_scores(
    analyses: &[ResponseAnalysis],
    demographics: &Demographics,
) -> (CategoryScores, f64) {
    let sentiment = sentiment_ratios(analyses);
    let emotions = emotion_ratios(analyses);
    let emotion = |label: &str| emotions.get(label).copied().unwrap_or(0.0);

    let joy = emotion("joy");
    let sadness = emotion("sadness");
    let anger = emotion("anger");
    let fear = emotion("fear");
    let disgust = emotion("disgust");
    let love = emotion("love");

    let age_factor = (demographics.age as f64 / 60.0).min(1.0);

    let scores = CategoryScores {
        self_awareness: 50.0 + 50.0 * (joy + love - sadness - anger),
        emotional_resilience: 50.0
            + 50.0 * (sentiment.positive - sentiment.negative - fear * 0.5)
            + 5.0 * age_factor,
        conflict_resolution: 50.0 + 50.0 * (sentiment.positive - anger - disgust),
        cultural_awareness: 50.0 + 50.0 * (sentiment.neutral + love - disgust),
        empathy: 50.0 + 50.0 * (love + sadness * 0.7 - disgust),
        stress_management: 50.0 + 50.0 * (sentiment.positive - fear - anger) + 3.0 * age_factor,
    }
    .clamped();

    let overall = scores.mean();
    (scores, overall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographics::Gender;

    fn demographics(age: i64) -> Demographics {
        Demographics::new(age, Gender::Other, "Engineer").unwrap()
    }

    fn analysis(label: SentimentLabel, score: f64, emotions: &[(&str, f64)]) -> ResponseAnalysis {
        let map = emotions
            .iter()
            .map(|(l, s)| (l.to_string(), *s))
            .collect();
        ResponseAnalysis::new(label, score, map)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_no_analyses_uses_default_ratios() {
        let (scores, overall) = calculate_eq_scores(&[], &demographics(30));

        assert!(approx(scores.self_awareness, 50.0));
        // 50 + 50 * (0.33 - 0.33) + 5 * 0.5
        assert!(approx(scores.emotional_resilience, 52.5));
        assert!(approx(scores.conflict_resolution, 66.5));
        assert!(approx(scores.cultural_awareness, 66.5));
        assert!(approx(scores.empathy, 50.0));
        assert!(approx(scores.stress_management, 66.5 + 1.5));
        assert!(approx(overall, scores.mean()));
    }

    #[test]
    fn test_positive_joyful_answers() {
        let analyses = vec![
            analysis(SentimentLabel::Positive, 0.9, &[("joy", 0.6), ("love", 0.2), ("neutral", 0.2)]),
            analysis(SentimentLabel::Positive, 0.7, &[("joy", 0.4), ("love", 0.4), ("neutral", 0.2)]),
        ];
        let (scores, _) = calculate_eq_scores(&analyses, &demographics(60));

        // positive ratio 0.8; joy 0.5, love 0.3
        assert!(approx(scores.self_awareness, 90.0));
        assert!(approx(scores.emotional_resilience, 50.0 + 40.0 + 5.0));
        assert!(approx(scores.conflict_resolution, 90.0));
        assert!(approx(scores.cultural_awareness, 65.0));
        assert!(approx(scores.empathy, 65.0));
        assert!(approx(scores.stress_management, 93.0));
    }

    #[test]
    fn test_scores_are_clamped() {
        let analyses = vec![analysis(SentimentLabel::Negative, 1.0, &[("anger", 0.6), ("disgust", 0.4)])];
        let (scores, overall) = calculate_eq_scores(&analyses, &demographics(10));

        for (_, value) in scores.entries() {
            assert!((0.0..=100.0).contains(&value));
        }
        assert!(approx(scores.conflict_resolution, 0.0));
        assert!((0.0..=100.0).contains(&overall));
    }

    #[test]
    fn test_age_factor_caps_at_sixty() {
        let (at_sixty, _) = calculate_eq_scores(&[], &demographics(60));
        let (at_ninety, _) = calculate_eq_scores(&[], &demographics(90));
        assert_eq!(at_sixty, at_ninety);
    }

    #[test]
    fn test_zero_emotion_total_splits_evenly() {
        let analyses = vec![analysis(SentimentLabel::Neutral, 0.5, &[("joy", 0.0), ("sadness", 0.0)])];
        let ratios = emotion_ratios(&analyses);
        assert!(approx(ratios["joy"], 0.5));
        assert!(approx(ratios["sadness"], 0.5));

        // joy and sadness cancel in self-awareness
        let (scores, _) = calculate_eq_scores(&analyses, &demographics(30));
        assert!(approx(scores.self_awareness, 50.0));
    }

    #[test]
    fn test_eq_level_thresholds() {
        assert_eq!(EqLevel::from_score(39.99), EqLevel::Low);
        assert_eq!(EqLevel::from_score(40.0), EqLevel::Average);
        assert_eq!(EqLevel::from_score(70.0), EqLevel::Average);
        assert_eq!(EqLevel::from_score(70.01), EqLevel::High);
    }

    #[test]
    fn test_eq_level_strings() {
        assert_eq!(EqLevel::High.to_string(), "High EQ");
        assert_eq!("average".parse::<EqLevel>().unwrap(), EqLevel::Average);
        assert_eq!("Low EQ".parse::<EqLevel>().unwrap(), EqLevel::Low);
        assert_eq!(
            serde_json::to_string(&EqLevel::Average).unwrap(),
            "\"Average EQ\""
        );
    }
}
