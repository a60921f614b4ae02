//! Physio Emotion Agent - emotional state estimation from physiological sensors.
//!
//! This library samples skin temperature, ECG and galvanic skin response
//! through an ADC, averages them over windows, classifies each window into
//! one of six emotional states with a pre-trained model, and hands the result
//! (with a short suggestion) to a result sink.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Physio Emotion Agent                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Sensor    │──▶│  Windowing  │──▶│ Classifier  │       │
//! │  │ (IIO/replay)│   │  (average)  │   │(scale+model)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │   Audit     │                     │   Result    │       │
//! │  │    Log      │                     │    Sink     │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use physio_emotion_agent::{
//!     ClassifierAdapter, ReplaySource, ResultPublisher, SessionConfig, SessionLoop,
//!     ShutdownSignal,
//! };
//!
//! let classifier = ClassifierAdapter::load("scaler.json", "final_emotion_model.json")
//!     .expect("artifacts present");
//! let source = ReplaySource::from_file("recording.json").expect("readable recording");
//! let mut publisher = ResultPublisher::log_only();
//!
//! let mut session = SessionLoop::new(
//!     source,
//!     &classifier,
//!     &mut publisher,
//!     ShutdownSignal::new(),
//!     SessionConfig::default(),
//! );
//! let report = session.run().expect("session completes");
//! println!("{} windows classified", report.records.len());
//! ```

pub mod audit;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod core;
pub mod sensor;
pub mod shutdown;
pub mod sink;

// Re-export key types at crate root for convenience
pub use audit::{AuditLog, AuditStats, SharedAuditLog};
pub use capture::{CapturePlan, CaptureReport, DatasetCapture};
pub use classifier::{ClassifierAdapter, ClassifierError, ModelArtifact, StandardScaler};
pub use config::{Config, SensorBackend, SinkBackend};
pub use core::{
    AveragedTriple, CompositeOutput, EmissionMode, EmotionLabel, FeatureVector, ResultRecord,
    SessionConfig, SessionError, SessionLoop, SessionOutcome, SessionReport, WindowAverager,
};
pub use sensor::{Reading, ReplaySource, SensorError, SensorReader, SensorSource};
pub use shutdown::ShutdownSignal;
pub use sink::{JsonlSink, LogSink, ResultPublisher, ResultSink, SinkError};

#[cfg(feature = "cloud")]
pub use sink::CloudSink;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
