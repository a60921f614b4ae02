//! Core pipeline logic.
//!
//! This module contains:
//! - Window averaging of sensor readings
//! - The fixed-order feature vector fed to the classifier
//! - The emotion catalog and composite outputs
//! - Result records and the session loop that produces them

pub mod catalog;
pub mod features;
pub mod record;
pub mod session;
pub mod windowing;

// Re-export commonly used types
pub use catalog::{composite, CatalogError, CompositeOutput, EmotionLabel};
pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use record::{PersistedDocument, Prediction, ResultRecord};
pub use session::{
    EmissionMode, SessionConfig, SessionError, SessionLoop, SessionOutcome, SessionReport,
    SessionState,
};
pub use windowing::{AveragedTriple, WindowAccumulator, WindowAverager};
