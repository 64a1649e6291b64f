use thiserror::Error;

/// Invalid demographics on the intake form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Age must be between {min} and {max} (got {age}).")]
    AgeOutOfRange { age: i64, min: u8, max: u8 },

    #[error("Profession is required.")]
    MissingProfession,

    #[error("Profession must be at most {max} characters (got {len}).")]
    ProfessionTooLong { len: usize, max: usize },

    #[error("Unknown gender: {0}")]
    UnknownGender(String),
}

/// Answers that do not meet the quality bar. Answers are numbered from 1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Answer {answer} cannot be empty. Please provide a thoughtful response.")]
    Empty { answer: usize },

    #[error(
        "Answer {answer} is too short. Please provide at least {min_words} words \
         (currently {words} words). Your response should be detailed and reflective."
    )]
    TooShort {
        answer: usize,
        words: usize,
        min_words: usize,
    },

    #[error("Expected {expected} answers but received {got}.")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error("{0}")]
    Validation(#[from] ResponseError),

    #[error("Model error: {0}")]
    Model(#[from] eqlens_model::ModelError),

    #[error("Scoring was cancelled")]
    Cancelled,
}
