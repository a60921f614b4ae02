//! Fitted per-feature standardisation.

use crate::classifier::ClassifierError;
use crate::core::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};

/// Affine per-feature normalisation: `(x - mean) / scale`.
///
/// The artifact records the column names it was fit on; they must match
/// [`FEATURE_NAMES`] exactly, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: [f64; FEATURE_COUNT],
    pub scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            mean,
            scale,
        }
    }

    /// A scaler that leaves values unchanged.
    pub fn identity() -> Self {
        Self::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT])
    }

    /// Check column order and that every scale is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_names != FEATURE_NAMES {
            return Err(format!(
                "scaler was fit on columns {:?}, expected {:?}",
                self.feature_names, FEATURE_NAMES
            ));
        }

        for (name, (mean, scale)) in FEATURE_NAMES.iter().zip(self.mean.iter().zip(&self.scale)) {
            if !mean.is_finite() {
                return Err(format!("non-finite mean for {name}"));
            }
            if !scale.is_finite() || *scale == 0.0 {
                return Err(format!("invalid scale {scale} for {name}"));
            }
        }

        Ok(())
    }

    pub fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut scaled = features.to_array();
        for (i, value) in scaled.iter_mut().enumerate() {
            *value = (*value - self.mean[i]) / self.scale[i];
        }
        scaled
    }

    /// Parse and validate a scaler artifact.
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let scaler: Self = serde_json::from_str(json).map_err(|e| ClassifierError::ArtifactInvalid {
            artifact: "scaler".to_string(),
            reason: e.to_string(),
        })?;
        scaler
            .validate()
            .map_err(|reason| ClassifierError::ArtifactInvalid {
                artifact: "scaler".to_string(),
                reason,
            })?;
        Ok(scaler)
    }
}
