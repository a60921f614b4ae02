//! The classifier feature vector.
//!
//! The scaler and model were fit on columns `[Temperature, ECG, GSR]`. Keeping
//! the vector as a named struct means callers can only build it field by
//! field; the positional form exists solely at the scaler boundary.

use crate::core::windowing::AveragedTriple;
use serde::{Deserialize, Serialize};

/// Column names in model order.
pub const FEATURE_NAMES: [&str; 3] = ["Temperature", "ECG", "GSR"];

/// Number of model input features.
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Averaged inputs for one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Average skin temperature in °C
    pub temperature: f64,
    /// Average ECG voltage
    pub ecg: f64,
    /// Average GSR voltage
    pub gsr: f64,
}

impl FeatureVector {
    pub fn new(temperature: f64, ecg: f64, gsr: f64) -> Self {
        Self {
            temperature,
            ecg,
            gsr,
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.temperature, self.ecg, self.gsr]
    }

    /// Whether every feature is a finite number.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl From<&AveragedTriple> for FeatureVector {
    fn from(triple: &AveragedTriple) -> Self {
        Self {
            temperature: triple.temperature,
            ecg: triple.ecg,
            gsr: triple.gsr,
        }
    }
}
