use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_AGE: u8 = 10;
pub const MAX_AGE: u8 = 100;
pub const MAX_PROFESSION_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotSay,
}

impl Gender {
    /// Stored form, as submitted by the intake form
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotSay => "prefer_not_say",
        }
    }

    /// Label shown on the results page
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::PreferNotSay => "Prefer not to say",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "prefer_not_say" => Ok(Gender::PreferNotSay),
            _ => Err(ValidationError::UnknownGender(s.to_string())),
        }
    }
}

/// Who is taking the assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u8,
    pub gender: Gender,
    pub profession: String,
}

impl Demographics {
    /// Validate intake form values. The profession is stored trimmed.
    pub fn new(age: i64, gender: Gender, profession: &str) -> Result<Self, ValidationError> {
        if age < MIN_AGE as i64 || age > MAX_AGE as i64 {
            return Err(ValidationError::AgeOutOfRange {
                age,
                min: MIN_AGE,
                max: MAX_AGE,
            });
        }

        let profession = profession.trim();
        if profession.is_empty() {
            return Err(ValidationError::MissingProfession);
        }

        let len = profession.chars().count();
        if len > MAX_PROFESSION_CHARS {
            return Err(ValidationError::ProfessionTooLong {
                len,
                max: MAX_PROFESSION_CHARS,
            });
        }

        Ok(Self {
            age: age as u8,
            gender,
            profession: profession.to_string(),
        })
    }
}
