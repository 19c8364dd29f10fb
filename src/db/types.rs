use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "examstatus", rename_all = "lowercase")]
pub(crate) enum ExamStatus {
    Saved,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Accepts free-form client wording such as "Medium" or " hard ".
    pub(crate) fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" | "low" => Some(Self::Easy),
            "medium" | "intermediate" | "normal" => Some(Self::Medium),
            "hard" | "high" | "difficult" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questionkind", rename_all = "snake_case")]
pub(crate) enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    OpenAnalysis,
    OpenExercise,
}

impl QuestionKind {
    pub(crate) const ALL: [QuestionKind; 4] =
        [Self::MultipleChoice, Self::TrueFalse, Self::OpenAnalysis, Self::OpenExercise];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::OpenAnalysis => "open_analysis",
            Self::OpenExercise => "open_exercise",
        }
    }

    /// Accepts `multiple-choice`, `Multiple Choice`, `multipleChoice` and the canonical form.
    pub(crate) fn parse_loose(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "multiplechoice" | "mcq" => Some(Self::MultipleChoice),
            "truefalse" | "boolean" => Some(Self::TrueFalse),
            "openanalysis" | "analysis" => Some(Self::OpenAnalysis),
            "openexercise" | "exercise" => Some(Self::OpenExercise),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_kind_parses_client_spellings() {
        assert_eq!(QuestionKind::parse_loose("multiple-choice"), Some(QuestionKind::MultipleChoice));
        assert_eq!(QuestionKind::parse_loose("True False"), Some(QuestionKind::TrueFalse));
        assert_eq!(QuestionKind::parse_loose("openAnalysis"), Some(QuestionKind::OpenAnalysis));
        assert_eq!(QuestionKind::parse_loose("open_exercise"), Some(QuestionKind::OpenExercise));
        assert_eq!(QuestionKind::parse_loose("essay"), None);
    }

    #[test]
    fn question_kind_serializes_snake_case() {
        let value = serde_json::to_value(QuestionKind::TrueFalse).unwrap();
        assert_eq!(value, "true_false");
        for kind in QuestionKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn difficulty_parses_loosely() {
        assert_eq!(DifficultyLevel::parse_loose(" Hard "), Some(DifficultyLevel::Hard));
        assert_eq!(DifficultyLevel::parse_loose("extreme"), None);
    }
}
