//! Emotion classification from averaged sensor windows.
//!
//! This module contains:
//! - The fitted feature scaler
//! - Serialized model families and the [`Classifier`] capability
//! - The adapter that validates model output against the emotion catalog

pub mod adapter;
pub mod model;
pub mod scaler;

use std::path::PathBuf;

// Re-export commonly used types
pub use adapter::ClassifierAdapter;
pub use model::{Classifier, ModelArtifact, RawPrediction};
pub use scaler::StandardScaler;

/// Classifier errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// A scaler or model file does not exist
    ArtifactMissing(PathBuf),
    /// A scaler or model file could not be read or parsed
    ArtifactInvalid { artifact: String, reason: String },
    /// The model produced a code outside the emotion catalog
    InvalidLabel(i64),
    /// An averaged feature was NaN or infinite
    NonFiniteFeature,
    /// The model could not rank classes (NaN or infinite score)
    NonFiniteScore,
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierError::ArtifactMissing(path) => {
                write!(f, "Classifier artifact not found: {}", path.display())
            }
            ClassifierError::ArtifactInvalid { artifact, reason } => {
                write!(f, "Invalid classifier artifact ({artifact}): {reason}")
            }
            ClassifierError::InvalidLabel(code) => {
                write!(f, "Classification fault: model returned label {code} outside 0..=5")
            }
            ClassifierError::NonFiniteFeature => {
                write!(f, "Classification fault: non-finite feature value")
            }
            ClassifierError::NonFiniteScore => {
                write!(f, "Classification fault: non-finite model score")
            }
        }
    }
}

impl std::error::Error for ClassifierError {}

impl ClassifierError {
    /// Whether this error happened while loading artifacts.
    pub fn is_startup_fault(&self) -> bool {
        matches!(
            self,
            ClassifierError::ArtifactMissing(_) | ClassifierError::ArtifactInvalid { .. }
        )
    }
}
