use serde::{Deserialize, Serialize};

use crate::analysis::ResponseAnalysis;
use crate::demographics::Demographics;
use crate::scoring::{calculate_eq_scores, emotion_totals, sentiment_totals, CategoryScores, EqLevel};

/// Share of sentiment weight per label, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    #[serde(rename = "POSITIVE")]
    pub positive: f64,
    #[serde(rename = "NEGATIVE")]
    pub negative: f64,
    #[serde(rename = "NEUTRAL")]
    pub neutral: f64,
}

impl SentimentBreakdown {
    pub fn from_analyses(analyses: &[ResponseAnalysis]) -> Self {
        let (pos, neg, neu) = sentiment_totals(analyses);
        let total = pos + neg + neu;

        if total > 0.0 {
            Self {
                positive: pos / total * 100.0,
                negative: neg / total * 100.0,
                neutral: neu / total * 100.0,
            }
        } else {
            Self {
                positive: 33.3,
                negative: 33.3,
                neutral: 33.3,
            }
        }
    }
}

/// One emotion's share of the total emotion weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionShare {
    pub label: String,
    pub percent: f64,
}

/// Emotion shares, largest first. Empty when no emotion carried any weight.
pub fn emotion_breakdown(analyses: &[ResponseAnalysis]) -> Vec<EmotionShare> {
    let totals = emotion_totals(analyses);
    let grand_total: f64 = totals.values().sum();
    if grand_total <= 0.0 {
        return Vec::new();
    }

    let mut shares: Vec<EmotionShare> = totals
        .into_iter()
        .map(|(label, total)| EmotionShare {
            label,
            percent: total / grand_total * 100.0,
        })
        .collect();

    shares.sort_by(|a, b| {
        b.percent
            .partial_cmp(&a.percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    shares
}

/// Everything the results page shows for a completed assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub category_scores: CategoryScores,
    pub overall_score: f64,
    pub eq_level: EqLevel,
    pub sentiment_percent: SentimentBreakdown,
    pub emotion_percent: Vec<EmotionShare>,
    pub analyses: Vec<ResponseAnalysis>,
}

impl AssessmentReport {
    pub fn build(analyses: Vec<ResponseAnalysis>, demographics: &Demographics) -> Self {
        let (category_scores, overall_score) = calculate_eq_scores(&analyses, demographics);
        Self {
            category_scores,
            overall_score,
            eq_level: EqLevel::from_score(overall_score),
            sentiment_percent: SentimentBreakdown::from_analyses(&analyses),
            emotion_percent: emotion_breakdown(&analyses),
            analyses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SentimentLabel;
    use crate::demographics::Gender;

    fn analysis(label: SentimentLabel, score: f64, emotions: &[(&str, f64)]) -> ResponseAnalysis {
        ResponseAnalysis::new(
            label,
            score,
            emotions.iter().map(|(l, s)| (l.to_string(), *s)).collect(),
        )
    }

    #[test]
    fn test_sentiment_percentages_sum_to_100() {
        let analyses = vec![
            analysis(SentimentLabel::Positive, 0.9, &[]),
            analysis(SentimentLabel::Negative, 0.6, &[]),
            analysis(SentimentLabel::Neutral, 0.5, &[]),
        ];
        let breakdown = SentimentBreakdown::from_analyses(&analyses);

        assert!((breakdown.positive - 45.0).abs() < 1e-9);
        assert!((breakdown.negative - 30.0).abs() < 1e-9);
        let sum = breakdown.positive + breakdown.negative + breakdown.neutral;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_sentiment_defaults_when_empty() {
        let breakdown = SentimentBreakdown::from_analyses(&[]);
        assert_eq!(breakdown.positive, 33.3);
        assert_eq!(breakdown.negative, 33.3);
        assert_eq!(breakdown.neutral, 33.3);
    }

    #[test]
    fn test_emotion_breakdown_sorted_descending() {
        let analyses = vec![
            analysis(SentimentLabel::Neutral, 0.5, &[("fear", 0.2), ("joy", 0.4), ("anger", 0.4)]),
            analysis(SentimentLabel::Neutral, 0.5, &[("fear", 0.6), ("joy", 0.1), ("anger", 0.3)]),
        ];
        let shares = emotion_breakdown(&analyses);

        let labels: Vec<_> = shares.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["fear", "anger", "joy"]);
        assert!(shares.windows(2).all(|w| w[0].percent >= w[1].percent));
        assert!((shares[0].percent - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_emotion_breakdown_empty_without_weight() {
        let analyses = vec![analysis(SentimentLabel::Neutral, 0.5, &[("joy", 0.0)])];
        assert!(emotion_breakdown(&analyses).is_empty());
    }

    #[test]
    fn test_report_serializes_display_labels() {
        let demographics = Demographics::new(30, Gender::Male, "Engineer").unwrap();
        let report = AssessmentReport::build(
            vec![analysis(SentimentLabel::Positive, 0.8, &[("joy", 1.0)])],
            &demographics,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["sentiment_percent"]["POSITIVE"].as_f64().unwrap() > 99.0);
        assert_eq!(json["emotion_percent"][0]["label"], "joy");
        assert_eq!(json["eq_level"], report.eq_level.as_str());
        assert_eq!(json["analyses"][0]["sentiment_label"], "POSITIVE");
    }
}
