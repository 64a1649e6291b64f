use crate::error::ResponseError;

/// Default minimum number of words per answer.
pub const MIN_WORDS_PER_RESPONSE: usize = 10;

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Trim surrounding whitespace from every answer.
pub fn normalize_answers(answers: Vec<String>) -> Vec<String> {
    answers.into_iter().map(|a| a.trim().to_string()).collect()
}

/// Check each answer in order and report the first one that falls short.
pub fn validate_responses(answers: &[String], min_words: usize) -> Result<(), ResponseError> {
    for (idx, answer) in answers.iter().enumerate() {
        let number = idx + 1;

        if answer.trim().is_empty() {
            return Err(ResponseError::Empty { answer: number });
        }

        let words = count_words(answer);
        if words < min_words {
            return Err(ResponseError::TooShort {
                answer: number,
                words,
                min_words,
            });
        }
    }

    Ok(())
}

pub fn validate_answer_count(answers: &[String], questions: usize) -> Result<(), ResponseError> {
    if answers.len() != questions {
        return Err(ResponseError::CountMismatch {
            expected: questions,
            got: answers.len(),
        });
    }
    Ok(())
}
