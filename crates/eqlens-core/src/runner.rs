use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use eqlens_logging::{AssessmentEvent, Logger};
use tracing::{debug, info};

use crate::analysis::Analyzer;
use crate::demographics::Demographics;
use crate::error::AssessmentError;
use crate::summary::AssessmentReport;
use crate::validation::{validate_responses, MIN_WORDS_PER_RESPONSE};

/// Scores a set of answers: validate, analyze, score, interpret, summarize.
///
/// Blocking; model inference runs on the calling thread.
pub struct AssessmentRunner {
    analyzer: Analyzer,
    logger: Arc<Logger>,
    min_words: usize,
}

impl AssessmentRunner {
    pub fn new(analyzer: Analyzer, logger: Arc<Logger>) -> Self {
        Self {
            analyzer,
            logger,
            min_words: MIN_WORDS_PER_RESPONSE,
        }
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Run the pipeline for one assessment. `id` tags the emitted events.
    pub fn run(
        &self,
        id: &str,
        demographics: &Demographics,
        answers: &[String],
    ) -> Result<AssessmentReport, AssessmentError> {
        self.run_until_cancelled(id, demographics, answers, &AtomicBool::new(false))
    }

    /// Like [`run`](Self::run), but stops with [`AssessmentError::Cancelled`]
    /// once `cancelled` is set. Checked before each answer and before the
    /// score events are emitted, so an abandoned run never reports completion.
    pub fn run_until_cancelled(
        &self,
        id: &str,
        demographics: &Demographics,
        answers: &[String],
        cancelled: &AtomicBool,
    ) -> Result<AssessmentReport, AssessmentError> {
        let start = Instant::now();
        let check = || {
            if cancelled.load(Ordering::Acquire) {
                debug!(id, "Scoring abandoned");
                Err(AssessmentError::Cancelled)
            } else {
                Ok(())
            }
        };

        if let Err(e) = validate_responses(answers, self.min_words) {
            self.logger.log(&AssessmentEvent::ValidationFailed {
                id: id.to_string(),
                reason: e.to_string(),
            });
            return Err(e.into());
        }

        let mut analyses = Vec::with_capacity(answers.len());
        for (idx, answer) in answers.iter().enumerate() {
            check()?;
            let number = idx + 1;
            debug!(id, answer = number, "Analyzing response");

            let outcome = match self.analyzer.analyze_detailed(answer) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.logger.log(&AssessmentEvent::AssessmentFailed {
                        id: id.to_string(),
                        error: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

            if let Some(error) = outcome.emotion_error {
                self.logger.log(&AssessmentEvent::EmotionFallback {
                    id: id.to_string(),
                    answer: number,
                    error,
                });
            }

            let analysis = outcome.analysis;
            self.logger.log(&AssessmentEvent::ResponseAnalyzed {
                id: id.to_string(),
                answer: number,
                sentiment: analysis.sentiment_label.to_string(),
                sentiment_score: analysis.sentiment_score,
                primary_emotion: analysis.primary_emotion.clone(),
            });
            analyses.push(analysis);
        }

        let report = AssessmentReport::build(analyses, demographics);
        check()?;

        self.logger.log(&AssessmentEvent::ScoresCalculated {
            id: id.to_string(),
            overall_score: report.overall_score,
            eq_level: report.eq_level.to_string(),
        });

        let duration = start.elapsed();
        info!(
            id,
            overall = report.overall_score,
            level = %report.eq_level,
            "Assessment scored"
        );
        self.logger.log(&AssessmentEvent::AssessmentCompleted {
            id: id.to_string(),
            overall_score: report.overall_score,
            eq_level: report.eq_level.to_string(),
            duration_secs: duration.as_secs_f64(),
        });

        Ok(report)
    }
}
