mod analysis;
mod demographics;
mod error;
mod runner;
mod scenario;
mod scoring;
mod summary;
mod validation;

pub use analysis::{AnalysisOutcome, Analyzer, ResponseAnalysis, SentimentLabel};
pub use demographics::{Demographics, Gender, MAX_AGE, MAX_PROFESSION_CHARS, MIN_AGE};
pub use error::{AssessmentError, ResponseError, ValidationError};
pub use runner::AssessmentRunner;
pub use scenario::{generate_questions, generate_scenario, ProfessionTrack, Scenario};
pub use scoring::{calculate_eq_scores, CategoryScores, EqLevel, CATEGORIES};
pub use summary::{emotion_breakdown, AssessmentReport, EmotionShare, SentimentBreakdown};
pub use validation::{
    count_words, normalize_answers, validate_answer_count, validate_responses,
    MIN_WORDS_PER_RESPONSE,
};
