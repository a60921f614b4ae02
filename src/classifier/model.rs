//! Trained model artifacts.
//!
//! Models operate on already-scaled feature arrays and return the raw integer
//! class the model was trained with. Range checking against the emotion
//! catalog happens in the adapter.

use crate::classifier::ClassifierError;
use crate::core::features::FEATURE_COUNT;
use serde::{Deserialize, Serialize};

/// Raw model output before catalog validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    pub label: i64,
    pub confidence: Option<f64>,
}

/// A fitted model that maps a scaled feature array to a class.
pub trait Classifier {
    fn classify(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<RawPrediction, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<RawPrediction, ClassifierError> {
        (**self).classify(scaled)
    }
}

/// Serialized model families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Multinomial logistic regression: softmax over `coef · x + intercept`
    Logistic {
        classes: Vec<i64>,
        coef: Vec<[f64; FEATURE_COUNT]>,
        intercept: Vec<f64>,
    },
    /// Nearest centroid by Euclidean distance
    NearestCentroid {
        classes: Vec<i64>,
        centroids: Vec<[f64; FEATURE_COUNT]>,
    },
}

impl ModelArtifact {
    /// Check that the per-class tables line up.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelArtifact::Logistic {
                classes,
                coef,
                intercept,
            } => {
                if classes.is_empty() {
                    return Err("model has no classes".to_string());
                }
                if coef.len() != classes.len() || intercept.len() != classes.len() {
                    return Err(format!(
                        "{} classes but {} coefficient rows and {} intercepts",
                        classes.len(),
                        coef.len(),
                        intercept.len()
                    ));
                }
            }
            ModelArtifact::NearestCentroid { classes, centroids } => {
                if classes.is_empty() {
                    return Err("model has no classes".to_string());
                }
                if centroids.len() != classes.len() {
                    return Err(format!(
                        "{} classes but {} centroids",
                        classes.len(),
                        centroids.len()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a model artifact.
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let model: Self = serde_json::from_str(json).map_err(|e| ClassifierError::ArtifactInvalid {
            artifact: "model".to_string(),
            reason: e.to_string(),
        })?;
        model
            .validate()
            .map_err(|reason| ClassifierError::ArtifactInvalid {
                artifact: "model".to_string(),
                reason,
            })?;
        Ok(model)
    }
}

impl Classifier for ModelArtifact {
    fn classify(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<RawPrediction, ClassifierError> {
        match self {
            ModelArtifact::Logistic {
                classes,
                coef,
                intercept,
            } => {
                let scores: Vec<f64> = coef
                    .iter()
                    .zip(intercept)
                    .map(|(row, b)| dot(row, scaled) + b)
                    .collect();
                let probabilities = softmax(&scores);
                let best = argmax(&probabilities).ok_or(ClassifierError::NonFiniteScore)?;

                Ok(RawPrediction {
                    label: classes[best],
                    confidence: Some(probabilities[best]),
                })
            }
            ModelArtifact::NearestCentroid { classes, centroids } => {
                let distances: Vec<f64> = centroids
                    .iter()
                    .map(|c| -squared_distance(c, scaled))
                    .collect();
                let best = argmax(&distances).ok_or(ClassifierError::NonFiniteScore)?;

                Ok(RawPrediction {
                    label: classes[best],
                    confidence: None,
                })
            }
        }
    }
}

fn dot(a: &[f64; FEATURE_COUNT], b: &[f64; FEATURE_COUNT]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn squared_distance(a: &[f64; FEATURE_COUNT], b: &[f64; FEATURE_COUNT]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Index of the largest finite value; ties go to the first.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().copied().enumerate() {
        if !v.is_finite() {
            return None;
        }
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
