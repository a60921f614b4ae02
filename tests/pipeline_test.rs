//! End-to-end tests for the sampling, classification and publishing pipeline.
//!
//! Every test runs against replayed or scripted voltages; no hardware or
//! network is touched.

use physio_emotion_agent::audit::create_shared_log;
use physio_emotion_agent::classifier::{ClassifierAdapter, ClassifierError, StandardScaler};
use physio_emotion_agent::core::{
    EmissionMode, EmotionLabel, ResultRecord, SessionConfig, SessionError, SessionLoop,
    SessionOutcome,
};
use physio_emotion_agent::sensor::{
    Channel, ReplaySource, RetryingSource, SensorError, SensorSource, VoltageFrame,
};
use physio_emotion_agent::shutdown::ShutdownSignal;
use physio_emotion_agent::sink::{
    Credentials, Identity, JsonlSink, ResultPublisher, ResultSink, SinkError,
};
use physio_emotion_agent::ModelArtifact;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SCALER_JSON: &str = r#"{
    "feature_names": ["Temperature", "ECG", "GSR"],
    "mean": [0.0, 0.0, 0.0],
    "scale": [1.0, 1.0, 1.0]
}"#;

const MODEL_JSON: &str = r#"{
    "kind": "nearest_centroid",
    "classes": [0, 3],
    "centroids": [[21.0, 0.55, 0.35], [36.0, 1.5, 0.9]]
}"#;

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("physio-pipeline-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn load_classifier(name: &str) -> ClassifierAdapter {
    let dir = test_dir(name);
    std::fs::write(dir.join("scaler.json"), SCALER_JSON).unwrap();
    std::fs::write(dir.join("final_emotion_model.json"), MODEL_JSON).unwrap();
    ClassifierAdapter::load(dir.join("scaler.json"), dir.join("final_emotion_model.json")).unwrap()
}

fn config(mode: EmissionMode, sample_limit: Option<u64>) -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::ZERO,
        session_duration: None,
        sample_limit,
        mode,
        echo: false,
        timezone: chrono_tz::Tz::UTC,
    }
}

fn two_frame_replay() -> ReplaySource {
    ReplaySource::new(vec![
        VoltageFrame::new(0.20, 0.5, 0.3),
        VoltageFrame::new(0.22, 0.6, 0.4),
    ])
}

/// Constant voltages; triggers shutdown once `cancel_after` readings are taken.
struct ScriptedSource {
    shutdown: ShutdownSignal,
    cancel_after: usize,
    fail_at: Option<usize>,
    readings: usize,
}

impl ScriptedSource {
    fn cancelling(shutdown: ShutdownSignal, cancel_after: usize) -> Self {
        Self {
            shutdown,
            cancel_after,
            fail_at: None,
            readings: 0,
        }
    }
}

impl SensorSource for ScriptedSource {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
        if channel == Channel::Temperature {
            self.readings += 1;
            if Some(self.readings) == self.fail_at {
                return Err(SensorError::io(channel, "i2c bus error"));
            }
        }
        if channel == Channel::Gsr && self.readings == self.cancel_after {
            self.shutdown.trigger();
        }
        Ok(match channel {
            Channel::Temperature => 0.25,
            Channel::Ecg => 0.5,
            Channel::Gsr => 0.3,
        })
    }
}

struct CountingSink {
    accept_auth: bool,
    puts: Arc<AtomicUsize>,
}

impl ResultSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    fn authenticate(&mut self, _: Option<&Credentials>) -> Result<Identity, SinkError> {
        if self.accept_auth {
            Ok(Identity::new("uid-42"))
        } else {
            Err(SinkError::Auth("INVALID_PASSWORD".to_string()))
        }
    }

    fn put(&mut self, _: &ResultRecord, _: &Identity) -> Result<(), SinkError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Rejects the first `put` with a storage error, then accepts the rest.
struct FlakySink {
    puts: Arc<AtomicUsize>,
}

impl ResultSink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    fn authenticate(&mut self, _: Option<&Credentials>) -> Result<Identity, SinkError> {
        Ok(Identity::new("uid-7"))
    }

    fn put(&mut self, _: &ResultRecord, _: &Identity) -> Result<(), SinkError> {
        if self.puts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SinkError::Io("disk full".to_string()));
        }
        Ok(())
    }
}

#[test]
fn test_end_to_end_happy_window() {
    let classifier = load_classifier("e2e");
    let store = test_dir("e2e").join("results.jsonl");
    let _ = std::fs::remove_file(&store);

    let mut publisher =
        ResultPublisher::connect(Box::new(JsonlSink::new(&store).with_user_id("uid-1")), None);
    let mut session = SessionLoop::new(
        two_frame_replay(),
        &classifier,
        &mut publisher,
        ShutdownSignal::new(),
        config(EmissionMode::Continuous { window_size: 2 }, Some(2)),
    );

    let report = session.run().unwrap();
    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.windows.len(), 1);

    let window = report.windows[0];
    assert!((window.temperature - 21.0).abs() < 1e-9);
    assert!((window.ecg - 0.55).abs() < 1e-9);
    assert!((window.gsr - 0.35).abs() < 1e-9);

    let record = &report.records[0];
    assert_eq!(record.emotion, EmotionLabel::Happy);
    assert_eq!(record.suggestion, "Keep enjoying the moment!");
    assert_eq!(record.owner_id.as_deref(), Some("uid-1"));
    assert_eq!(report.persisted, 1);

    let line = std::fs::read_to_string(&store).unwrap();
    let document: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(document["userId"], "uid-1");
    assert_eq!(document["Output"]["Emotion"], "Happy");
    assert_eq!(document["Output"]["Suggestion"], "Keep enjoying the moment!");
    assert!(document["Timestamp"].is_string());
}

#[test]
fn test_missing_artifact_is_startup_fault() {
    let dir = test_dir("missing");
    std::fs::write(dir.join("scaler.json"), SCALER_JSON).unwrap();
    let _ = std::fs::remove_file(dir.join("absent_model.json"));

    let err = ClassifierAdapter::<ModelArtifact>::load(
        dir.join("scaler.json"),
        dir.join("absent_model.json"),
    )
    .unwrap_err();

    assert!(matches!(err, ClassifierError::ArtifactMissing(_)));
    assert!(err.is_startup_fault());
}

#[test]
fn test_cancelled_session_flushes_partial_window() {
    let classifier = ClassifierAdapter::new(
        StandardScaler::identity(),
        ModelArtifact::from_json(MODEL_JSON).unwrap(),
    );

    for k in 1..4 {
        let shutdown = ShutdownSignal::new();
        let mut publisher = ResultPublisher::log_only();
        let mut session = SessionLoop::new(
            ScriptedSource::cancelling(shutdown.clone(), k),
            &classifier,
            &mut publisher,
            shutdown,
            config(EmissionMode::Continuous { window_size: 10 }, None),
        );

        let report = session.run().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(report.windows.len(), 1, "k = {k}");
        assert_eq!(report.windows[0].sample_count, k);
        assert!((report.windows[0].temperature - 25.0).abs() < 1e-9);
    }
}

#[test]
fn test_cancel_before_first_sample_emits_nothing() {
    let classifier = ClassifierAdapter::new(
        StandardScaler::identity(),
        ModelArtifact::from_json(MODEL_JSON).unwrap(),
    );
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let mut publisher = ResultPublisher::log_only();
    let mut session = SessionLoop::new(
        ScriptedSource::cancelling(shutdown.clone(), usize::MAX),
        &classifier,
        &mut publisher,
        shutdown,
        config(EmissionMode::SessionEnd, None),
    );

    let report = session.run().unwrap();
    assert_eq!(report.outcome, SessionOutcome::Cancelled);
    assert_eq!(report.samples, 0);
    assert!(report.records.is_empty());
}

#[test]
fn test_auth_failure_still_produces_records() {
    let classifier = load_classifier("degraded");
    let puts = Arc::new(AtomicUsize::new(0));
    let mut publisher = ResultPublisher::connect(
        Box::new(CountingSink {
            accept_auth: false,
            puts: puts.clone(),
        }),
        None,
    );
    assert!(!publisher.is_persisting());

    let mut session = SessionLoop::new(
        two_frame_replay(),
        &classifier,
        &mut publisher,
        ShutdownSignal::new(),
        config(EmissionMode::SessionEnd, Some(2)),
    );

    let report = session.run().unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].emotion, EmotionLabel::Happy);
    assert!(report.records[0].owner_id.is_none());
    assert_eq!(report.persisted, 0);
    assert_eq!(puts.load(Ordering::SeqCst), 0);
}

#[test]
fn test_sensor_fault_aborts_session() {
    let classifier = load_classifier("fault");
    let audit = create_shared_log();
    let shutdown = ShutdownSignal::new();
    let source = ScriptedSource {
        shutdown: shutdown.clone(),
        cancel_after: usize::MAX,
        fail_at: Some(3),
        readings: 0,
    };

    let puts = Arc::new(AtomicUsize::new(0));
    let mut publisher = ResultPublisher::connect(
        Box::new(CountingSink {
            accept_auth: true,
            puts: puts.clone(),
        }),
        None,
    );
    let mut session = SessionLoop::new(
        source,
        &classifier,
        &mut publisher,
        shutdown,
        config(EmissionMode::SessionEnd, None),
    )
    .with_audit(audit.clone());

    let err = session.run().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Sensor(SensorError::Io {
            channel: Channel::Temperature,
            ..
        })
    ));
    // The two pending readings are abandoned, not classified.
    assert_eq!(puts.load(Ordering::SeqCst), 0);

    let stats = audit.stats();
    assert_eq!(stats.readings, 2);
    assert_eq!(stats.windows_emitted, 0);
    assert_eq!(stats.sessions_faulted, 1);
}

#[test]
fn test_retry_budget_absorbs_transient_faults() {
    let classifier = load_classifier("retry");
    let shutdown = ShutdownSignal::new();
    let source = ScriptedSource {
        shutdown: shutdown.clone(),
        cancel_after: usize::MAX,
        fail_at: Some(2),
        readings: 0,
    };

    let mut publisher = ResultPublisher::log_only();
    let mut session = SessionLoop::new(
        RetryingSource::new(source, 1),
        &classifier,
        &mut publisher,
        shutdown,
        config(EmissionMode::SessionEnd, Some(3)),
    );

    let report = session.run().unwrap();
    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.samples, 3);
    assert_eq!(report.windows[0].sample_count, 3);
}

#[test]
fn test_sink_fault_does_not_stop_session() {
    let classifier = load_classifier("sink-fault");
    let audit = create_shared_log();
    let puts = Arc::new(AtomicUsize::new(0));
    let mut publisher = ResultPublisher::connect(Box::new(FlakySink { puts: puts.clone() }), None)
        .with_audit(audit.clone());
    assert!(publisher.is_persisting());

    let mut session = SessionLoop::new(
        two_frame_replay().looping(true),
        &classifier,
        &mut publisher,
        ShutdownSignal::new(),
        config(EmissionMode::Continuous { window_size: 2 }, Some(6)),
    )
    .with_audit(audit.clone());

    let report = session.run().unwrap();
    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.windows.len(), 3);
    assert_eq!(report.records.len(), 3);

    // Every window after the rejected one is still offered to the sink.
    assert_eq!(puts.load(Ordering::SeqCst), 3);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.persisted, 2);

    let stats = audit.stats();
    assert_eq!(stats.records_dropped, 1);
    assert_eq!(stats.records_persisted, 2);
}
