use serde::{Deserialize, Serialize};

use crate::demographics::Demographics;

/// Profession family that selects the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionTrack {
    Education,
    Healthcare,
    Leadership,
    General,
}

impl ProfessionTrack {
    pub const ALL: [ProfessionTrack; 4] = [
        ProfessionTrack::Education,
        ProfessionTrack::Healthcare,
        ProfessionTrack::Leadership,
        ProfessionTrack::General,
    ];

    /// Case-insensitive keyword match, first family wins.
    pub fn from_profession(profession: &str) -> Self {
        let lowered = profession.to_lowercase();
        let matches = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

        if matches(&["teacher", "lecturer", "educator"]) {
            ProfessionTrack::Education
        } else if matches(&["nurse", "doctor", "physician"]) {
            ProfessionTrack::Healthcare
        } else if matches(&["manager", "lead", "director"]) {
            ProfessionTrack::Leadership
        } else {
            ProfessionTrack::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfessionTrack::Education => "education",
            ProfessionTrack::Healthcare => "healthcare",
            ProfessionTrack::Leadership => "leadership",
            ProfessionTrack::General => "general",
        }
    }

    fn scenario_text(&self) -> &'static str {
        match self {
            ProfessionTrack::Education => {
                "You are halfway through an important lesson when a student starts loudly \
                 criticizing your teaching in front of the whole class, calling you unfair and \
                 biased. Other students begin nodding along and the room turns tense. There are \
                 ten minutes left in the period and a key topic still to cover before next \
                 week's exam."
            }
            ProfessionTrack::Healthcare => {
                "It is the middle of a night shift on a busy ward. A patient's relative \
                 confronts you, furious about a delayed medication dose that left their family \
                 member in pain. They raise their voice, other patients and staff are watching, \
                 and they threaten to file a complaint while questioning your competence. Two \
                 other patients urgently need your attention."
            }
            ProfessionTrack::Leadership => {
                "You lead a project with a tight deadline. During a critical meeting two team \
                 members start a heated argument, each blaming the other for missed milestones \
                 and poor quality work, and it turns personal. The rest of the team looks \
                 uncomfortable. Delivery is due in 48 hours and your own manager expects a \
                 status update in two hours."
            }
            ProfessionTrack::General => {
                "You have just presented weeks of work to colleagues and stakeholders. A senior \
                 colleague publicly criticizes your approach, pointing out what they see as \
                 fundamental flaws in your method, in a condescending tone. Others in the room \
                 start questioning your decisions. You believe in the work, but now you face \
                 open doubt in front of everyone."
            }
        }
    }
}

impl std::fmt::Display for ProfessionTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProfessionTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "education" => Ok(ProfessionTrack::Education),
            "healthcare" => Ok(ProfessionTrack::Healthcare),
            "leadership" => Ok(ProfessionTrack::Leadership),
            "general" => Ok(ProfessionTrack::General),
            _ => Err(format!("Unknown profession track: {}", s)),
        }
    }
}

/// A challenging situation the respondent reflects on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub track: ProfessionTrack,
    pub text: String,
}

const QUESTIONS: [&str; 5] = [
    "What emotions would you feel in this situation, and why? Describe the intensity and \
     sequence of your emotional reactions.",
    "How would you manage your emotions before responding to the situation? What strategies \
     would you use to stay composed?",
    "How would you resolve this conflict or address this challenge? Describe your approach and \
     the reasoning behind it.",
    "How would you cope with the stress and pressure of this situation? What internal and \
     external resources would you draw upon?",
    "What would you learn from this experience, and how might it affect your future behavior \
     in similar situations?",
];

/// Pick the scenario for the respondent's profession.
///
/// Age and gender are collected for scoring and reporting; they do not
/// change the scenario.
pub fn generate_scenario(demographics: &Demographics) -> Scenario {
    let track = ProfessionTrack::from_profession(&demographics.profession);
    Scenario {
        track,
        text: track.scenario_text().to_string(),
    }
}

/// The reflective questions asked about a scenario.
pub fn generate_questions(_scenario: &Scenario) -> Vec<String> {
    QUESTIONS.iter().map(|q| q.to_string()).collect()
}
