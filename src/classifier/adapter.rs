//! Scaler + model pipeline producing validated emotion predictions.

use crate::classifier::model::{Classifier, ModelArtifact};
use crate::classifier::scaler::StandardScaler;
use crate::classifier::ClassifierError;
use crate::core::catalog::EmotionLabel;
use crate::core::features::FeatureVector;
use crate::core::record::Prediction;
use crate::core::windowing::AveragedTriple;
use std::path::Path;

/// Applies the fitted scaler, then the model, then checks the label.
///
/// Both parts are loaded once and never mutated; `predict` keeps no state
/// between calls.
#[derive(Debug, Clone)]
pub struct ClassifierAdapter<M = ModelArtifact> {
    scaler: StandardScaler,
    model: M,
}

impl ClassifierAdapter<ModelArtifact> {
    /// Load the scaler and model artifacts from disk.
    ///
    /// A missing file is reported as [`ClassifierError::ArtifactMissing`].
    pub fn load(
        scaler_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
    ) -> Result<Self, ClassifierError> {
        let scaler = StandardScaler::from_json(&read_artifact(scaler_path.as_ref())?)?;
        let model = ModelArtifact::from_json(&read_artifact(model_path.as_ref())?)?;

        tracing::info!(
            scaler = %scaler_path.as_ref().display(),
            model = %model_path.as_ref().display(),
            "loaded classifier artifacts"
        );

        Ok(Self { scaler, model })
    }
}

impl<M: Classifier> ClassifierAdapter<M> {
    pub fn new(scaler: StandardScaler, model: M) -> Self {
        Self { scaler, model }
    }

    /// Classify an averaged window.
    pub fn predict(&self, triple: &AveragedTriple) -> Result<Prediction, ClassifierError> {
        self.predict_features(&FeatureVector::from(triple))
    }

    /// Classify an explicit feature vector.
    pub fn predict_features(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        if !features.is_finite() {
            return Err(ClassifierError::NonFiniteFeature);
        }
        let scaled = self.scaler.transform(features);
        let raw = self.model.classify(&scaled)?;

        let label = EmotionLabel::from_code(raw.label)
            .map_err(|_| ClassifierError::InvalidLabel(raw.label))?;

        Ok(Prediction {
            label,
            confidence: raw.confidence,
        })
    }
}

fn read_artifact(path: &Path) -> Result<String, ClassifierError> {
    if !path.exists() {
        return Err(ClassifierError::ArtifactMissing(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| ClassifierError::ArtifactInvalid {
        artifact: path.display().to_string(),
        reason: e.to_string(),
    })
}
