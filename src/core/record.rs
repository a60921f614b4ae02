//! Classified results and their persisted document shape.

use crate::core::catalog::{CompositeOutput, EmotionLabel};
use crate::core::windowing::AveragedTriple;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: EmotionLabel,
    /// Model probability for `label`, when the model provides one
    pub confidence: Option<f64>,
}

/// One classified window, ready to hand to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// When the window was classified
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub ecg: f64,
    pub gsr: f64,
    pub emotion: EmotionLabel,
    pub suggestion: String,
    /// Authenticated owner, if any
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub sample_count: usize,
}

impl ResultRecord {
    pub fn new(triple: &AveragedTriple, prediction: Prediction, owner_id: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            temperature: triple.temperature,
            ecg: triple.ecg,
            gsr: triple.gsr,
            emotion: prediction.label,
            suggestion: prediction.label.suggestion().to_string(),
            owner_id,
            confidence: prediction.confidence,
            sample_count: triple.sample_count,
        }
    }

    pub fn output(&self) -> CompositeOutput {
        CompositeOutput {
            emotion: self.emotion,
            suggestion: self.suggestion.clone(),
        }
    }

    /// Document written to the result store.
    pub fn to_document(&self) -> PersistedDocument {
        PersistedDocument {
            timestamp: self.timestamp,
            user_id: self.owner_id.clone(),
            temperature: self.temperature,
            ecg: self.ecg,
            gsr: self.gsr,
            output: self.output(),
        }
    }
}

/// Stored shape: `{Timestamp, userId, Temperature, ECG, GSR, Output}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "ECG")]
    pub ecg: f64,
    #[serde(rename = "GSR")]
    pub gsr: f64,
    #[serde(rename = "Output")]
    pub output: CompositeOutput,
}
