//! Emotion catalog: label codes, names and suggestions.
//!
//! The mapping is closed and total over codes `0..=5`. Anything else is an
//! error, never an "Unknown" placeholder.

use serde::{Deserialize, Serialize};

/// The six emotional states the model can predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Happy,
    Sad,
    Neutral,
    Angry,
    Anxious,
    Stressed,
}

impl EmotionLabel {
    /// All labels in code order.
    pub const ALL: [EmotionLabel; 6] = [
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Neutral,
        EmotionLabel::Angry,
        EmotionLabel::Anxious,
        EmotionLabel::Stressed,
    ];

    /// Integer code used by the trained model.
    pub fn code(self) -> i64 {
        match self {
            EmotionLabel::Happy => 0,
            EmotionLabel::Sad => 1,
            EmotionLabel::Neutral => 2,
            EmotionLabel::Angry => 3,
            EmotionLabel::Anxious => 4,
            EmotionLabel::Stressed => 5,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, CatalogError> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(CatalogError::UnknownLabel(code))
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Result<Self, CatalogError> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownName(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Anxious => "Anxious",
            EmotionLabel::Stressed => "Stressed",
        }
    }

    pub fn suggestion(self) -> &'static str {
        match self {
            EmotionLabel::Happy => "Keep enjoying the moment!",
            EmotionLabel::Sad => "Take some time to relax and focus on yourself.",
            EmotionLabel::Neutral => "Maintain your calm and steady approach.",
            EmotionLabel::Angry => "Take deep breaths and try stepping away.",
            EmotionLabel::Anxious => "Focus on your breathing and grounding techniques.",
            EmotionLabel::Stressed => "Consider taking short breaks to decompress.",
        }
    }

    pub fn composite(self) -> CompositeOutput {
        CompositeOutput {
            emotion: self,
            suggestion: self.suggestion().to_string(),
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for EmotionLabel {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Emotion paired with its suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeOutput {
    #[serde(rename = "Emotion")]
    pub emotion: EmotionLabel,
    #[serde(rename = "Suggestion")]
    pub suggestion: String,
}

impl std::fmt::Display for CompositeOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.emotion, self.suggestion)
    }
}

/// Map a raw label code to its composite output.
pub fn composite(code: i64) -> Result<CompositeOutput, CatalogError> {
    EmotionLabel::from_code(code).map(EmotionLabel::composite)
}

/// Catalog lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownLabel(i64),
    UnknownName(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::UnknownLabel(code) => write!(f, "Unknown emotion label code: {code}"),
            CatalogError::UnknownName(name) => write!(f, "Unknown emotion name: '{name}'"),
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_total_over_codes() {
        for code in 0..=5 {
            let output = composite(code).unwrap();
            assert!(!output.emotion.name().is_empty());
            assert!(!output.suggestion.is_empty());
            assert_eq!(output.emotion.code(), code);
        }
    }

    #[test]
    fn test_codes_outside_range_fail() {
        for code in [-1, 6, 42, i64::MIN, i64::MAX] {
            assert_eq!(composite(code), Err(CatalogError::UnknownLabel(code)));
        }
    }

    #[test]
    fn test_table_entries() {
        assert_eq!(
            composite(0).unwrap(),
            CompositeOutput {
                emotion: EmotionLabel::Happy,
                suggestion: "Keep enjoying the moment!".to_string(),
            }
        );
        assert_eq!(
            composite(5).unwrap().suggestion,
            "Consider taking short breaks to decompress."
        );
        assert_eq!(EmotionLabel::from_code(3).unwrap(), EmotionLabel::Angry);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(EmotionLabel::from_name("anxious").unwrap(), EmotionLabel::Anxious);
        assert_eq!(" Sad ".parse::<EmotionLabel>().unwrap(), EmotionLabel::Sad);
        assert!(EmotionLabel::from_name("Bored").is_err());
    }

    #[test]
    fn test_composite_serialization() {
        let json = serde_json::to_value(EmotionLabel::Neutral.composite()).unwrap();
        assert_eq!(json["Emotion"], "Neutral");
        assert_eq!(json["Suggestion"], "Maintain your calm and steady approach.");
    }
}
