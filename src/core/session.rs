//! The sampling session loop.
//!
//! A session moves `Idle -> Running -> {Completed | Cancelled | Faulted}`.
//! While running it reads one [`Reading`](crate::sensor::Reading) per tick,
//! folds it into the window averager and, whenever a window completes,
//! classifies it and hands the record to the publisher. On completion or
//! cancellation the partial window is flushed; on a fault it is abandoned.

use crate::audit::SharedAuditLog;
use crate::classifier::{Classifier, ClassifierAdapter, ClassifierError, ModelArtifact};
use crate::core::record::ResultRecord;
use crate::core::windowing::{AveragedTriple, WindowAverager};
use crate::sensor::{Reading, SensorError, SensorReader, SensorSource};
use crate::shutdown::ShutdownSignal;
use crate::sink::publisher::{PublishOutcome, ResultPublisher};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::{Duration, Instant};

/// When averaged windows are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionMode {
    /// Emit every `window_size` readings, plus the partial window at the end
    Continuous { window_size: usize },
    /// Emit a single average of the whole session when it ends
    SessionEnd,
}

/// Session parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait between ticks
    pub poll_interval: Duration,
    /// Total session length; `None` runs until cancelled
    pub session_duration: Option<Duration>,
    /// Stop after this many readings
    pub sample_limit: Option<u64>,
    pub mode: EmissionMode,
    /// Print live readings and results to stdout
    pub echo: bool,
    /// Zone for printed timestamps
    pub timezone: Tz,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(6),
            session_duration: Some(Duration::from_secs(60)),
            sample_limit: None,
            mode: EmissionMode::SessionEnd,
            echo: false,
            timezone: Tz::UTC,
        }
    }
}

/// Lifecycle state of a [`SessionLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Faulted,
}

/// How a session that did not fault ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Readings taken
    pub samples: u64,
    /// Averaged windows emitted
    pub windows: Vec<AveragedTriple>,
    /// Records handed to the publisher, in order
    pub records: Vec<ResultRecord>,
    /// Records the sink stored
    pub persisted: u64,
    /// Records the sink rejected
    pub dropped: u64,
}

/// Errors that abort a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Sensor(SensorError),
    Classification(ClassifierError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Sensor(e) => write!(f, "Session aborted: {e}"),
            SessionError::Classification(e) => write!(f, "Session aborted: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Sensor(e) => Some(e),
            SessionError::Classification(e) => Some(e),
        }
    }
}

impl From<SensorError> for SessionError {
    fn from(e: SensorError) -> Self {
        SessionError::Sensor(e)
    }
}

impl From<ClassifierError> for SessionError {
    fn from(e: ClassifierError) -> Self {
        SessionError::Classification(e)
    }
}

/// Drives one sampling session.
pub struct SessionLoop<'a, S, M = ModelArtifact> {
    reader: SensorReader<S>,
    classifier: &'a ClassifierAdapter<M>,
    publisher: &'a mut ResultPublisher,
    shutdown: ShutdownSignal,
    audit: Option<SharedAuditLog>,
    config: SessionConfig,
    averager: WindowAverager,
    state: SessionState,
}

impl<'a, S: SensorSource, M: Classifier> SessionLoop<'a, S, M> {
    pub fn new(
        source: S,
        classifier: &'a ClassifierAdapter<M>,
        publisher: &'a mut ResultPublisher,
        shutdown: ShutdownSignal,
        config: SessionConfig,
    ) -> Self {
        let averager = match config.mode {
            EmissionMode::Continuous { window_size } => WindowAverager::new(window_size),
            EmissionMode::SessionEnd => WindowAverager::unbounded(),
        };

        Self {
            reader: SensorReader::new(source),
            classifier,
            publisher,
            shutdown,
            audit: None,
            config,
            averager,
            state: SessionState::Idle,
        }
    }

    pub fn with_audit(mut self, audit: SharedAuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion, cancellation or fault.
    ///
    /// Cancellation is not an error. A fault abandons the partial window and
    /// is returned after being logged.
    pub fn run(&mut self) -> Result<SessionReport, SessionError> {
        self.averager.reset();
        self.state = SessionState::Running;

        let mut report = SessionReport {
            outcome: SessionOutcome::Completed,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            samples: 0,
            windows: Vec::new(),
            records: Vec::new(),
            persisted: 0,
            dropped: 0,
        };

        tracing::info!(
            mode = ?self.config.mode,
            poll_interval_secs = self.config.poll_interval.as_secs_f64(),
            duration_secs = self.config.session_duration.map(|d| d.as_secs()),
            "session started"
        );

        let result = self
            .sample(&mut report)
            .and_then(|outcome| self.finish(&mut report).map(|()| outcome));

        report.ended_at = Utc::now();

        match result {
            Ok(outcome) => {
                report.outcome = outcome;
                self.state = match outcome {
                    SessionOutcome::Completed => SessionState::Completed,
                    SessionOutcome::Cancelled => SessionState::Cancelled,
                };
                tracing::info!(
                    ?outcome,
                    samples = report.samples,
                    windows = report.windows.len(),
                    "session ended"
                );
                Ok(report)
            }
            Err(e) => {
                let abandoned = self.averager.pending();
                self.averager.reset();
                self.state = SessionState::Faulted;
                if let Some(audit) = &self.audit {
                    audit.record_session_fault();
                }
                tracing::error!(
                    error = %e,
                    samples = report.samples,
                    windows_emitted = report.windows.len(),
                    abandoned_readings = abandoned,
                    "session faulted"
                );
                Err(e)
            }
        }
    }

    /// Tick until the session is over.
    fn sample(&mut self, report: &mut SessionReport) -> Result<SessionOutcome, SessionError> {
        let clock = Instant::now();

        loop {
            if self.shutdown.is_triggered() {
                return Ok(SessionOutcome::Cancelled);
            }
            if self.is_finished(clock.elapsed(), report.samples) {
                return Ok(SessionOutcome::Completed);
            }

            let reading = self.reader.read()?;
            report.samples += 1;
            if let Some(audit) = &self.audit {
                audit.record_reading();
            }
            self.echo_reading(&reading);

            if let Some(triple) = self.averager.push(&reading) {
                self.emit(triple, report)?;
            }

            if self.shutdown.wait(self.config.poll_interval) {
                return Ok(SessionOutcome::Cancelled);
            }
        }
    }

    /// Flush the partial window, if any.
    fn finish(&mut self, report: &mut SessionReport) -> Result<(), SessionError> {
        match self.averager.flush() {
            Some(triple) => self.emit(triple, report),
            None => {
                tracing::info!("no readings pending, nothing to report");
                Ok(())
            }
        }
    }

    fn is_finished(&self, elapsed: Duration, samples: u64) -> bool {
        let out_of_time = self
            .config
            .session_duration
            .is_some_and(|d| !d.is_zero() && elapsed >= d);
        let out_of_samples = self.config.sample_limit.is_some_and(|n| samples >= n);
        out_of_time || out_of_samples
    }

    /// Classify a window and publish the resulting record.
    fn emit(&mut self, triple: AveragedTriple, report: &mut SessionReport) -> Result<(), SessionError> {
        if let Some(audit) = &self.audit {
            audit.record_window();
        }
        report.windows.push(triple);

        let prediction = self.classifier.predict(&triple)?;
        if let Some(audit) = &self.audit {
            audit.record_prediction();
        }

        let record = ResultRecord::new(&triple, prediction, self.publisher.owner_id());
        self.echo_record(&record);

        match self.publisher.publish(&record) {
            PublishOutcome::Persisted => report.persisted += 1,
            PublishOutcome::Dropped(e) => {
                report.dropped += 1;
                if self.config.echo {
                    eprintln!("Warning: result not saved: {e}");
                }
            }
            PublishOutcome::LogOnly => {}
        }

        report.records.push(record);
        Ok(())
    }

    fn echo_reading(&self, reading: &Reading) {
        tracing::debug!(
            temperature = reading.temperature,
            ecg = reading.ecg,
            gsr = reading.gsr,
            "reading"
        );
        if self.config.echo {
            println!(
                "Timestamp: {}, Temp: {:.2}°C, ECG: {:.2}V, GSR: {:.2}V",
                reading
                    .captured_at
                    .with_timezone(&self.config.timezone)
                    .format("%Y-%m-%d %H:%M:%S%.6f"),
                reading.temperature,
                reading.ecg,
                reading.gsr
            );
        }
    }

    fn echo_record(&self, record: &ResultRecord) {
        if self.config.echo {
            println!(
                "Average Temp: {:.2}°C, Average ECG: {:.2}V, Average GSR: {:.2}V ({} samples)",
                record.temperature, record.ecg, record.gsr, record.sample_count
            );
            println!("Output: {}", record.output());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::create_shared_log;
    use crate::classifier::{RawPrediction, StandardScaler};
    use crate::core::catalog::EmotionLabel;
    use crate::core::features::FEATURE_COUNT;
    use crate::sensor::{Channel, ReplaySource, VoltageFrame};
    use crate::sink::{Credentials, Identity, LogSink, ResultSink, SinkError};
    use std::sync::{Arc, Mutex};

    struct FixedModel(i64);

    impl Classifier for FixedModel {
        fn classify(&self, _: &[f64; FEATURE_COUNT]) -> Result<RawPrediction, ClassifierError> {
            Ok(RawPrediction {
                label: self.0,
                confidence: None,
            })
        }
    }

    /// Serves constant frames and triggers shutdown after `cancel_after` readings.
    struct CancellingSource {
        shutdown: ShutdownSignal,
        cancel_after: usize,
        reads: usize,
    }

    impl SensorSource for CancellingSource {
        fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
            self.reads += 1;
            if self.reads == self.cancel_after * 3 {
                self.shutdown.trigger();
            }
            Ok(match channel {
                Channel::Temperature => 0.30,
                Channel::Ecg => 1.0,
                Channel::Gsr => 0.5,
            })
        }
    }

    /// Remembers the sample count of every stored record.
    struct RecordingSink {
        stored: Arc<Mutex<Vec<usize>>>,
    }

    impl ResultSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn authenticate(&mut self, _: Option<&Credentials>) -> Result<Identity, SinkError> {
            Ok(Identity::new("uid-1"))
        }

        fn put(&mut self, record: &ResultRecord, _: &Identity) -> Result<(), SinkError> {
            self.stored.lock().unwrap().push(record.sample_count);
            Ok(())
        }
    }

    fn quick_config(mode: EmissionMode) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::ZERO,
            session_duration: None,
            sample_limit: None,
            mode,
            echo: false,
            timezone: Tz::UTC,
        }
    }

    #[test]
    fn test_session_end_mode_emits_once() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(2));
        let mut publisher = ResultPublisher::log_only();
        let source = ReplaySource::new(vec![VoltageFrame::new(0.30, 1.0, 0.5); 5]);

        let mut config = quick_config(EmissionMode::SessionEnd);
        config.sample_limit = Some(5);

        let mut session =
            SessionLoop::new(source, &adapter, &mut publisher, ShutdownSignal::new(), config);
        assert_eq!(session.state(), SessionState::Idle);

        let report = session.run().unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.samples, 5);
        assert_eq!(report.windows.len(), 1);
        assert_eq!(report.windows[0].sample_count, 5);
        assert_eq!(report.records[0].emotion, EmotionLabel::Neutral);
    }

    #[test]
    fn test_cancel_flushes_partial_window() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(0));
        let mut publisher = ResultPublisher::log_only();
        let shutdown = ShutdownSignal::new();
        let source = CancellingSource {
            shutdown: shutdown.clone(),
            cancel_after: 3,
            reads: 0,
        };

        let mut session = SessionLoop::new(
            source,
            &adapter,
            &mut publisher,
            shutdown,
            quick_config(EmissionMode::Continuous { window_size: 10 }),
        );

        let report = session.run().unwrap();
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(report.samples, 3);
        assert_eq!(report.windows.len(), 1);
        assert_eq!(report.windows[0].sample_count, 3);
        assert!((report.windows[0].temperature - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_cancel_before_any_sample_emits_nothing() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(0));
        let mut publisher = ResultPublisher::log_only();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let mut session = SessionLoop::new(
            ReplaySource::new(vec![VoltageFrame::new(0.3, 1.0, 0.5)]),
            &adapter,
            &mut publisher,
            shutdown,
            quick_config(EmissionMode::Continuous { window_size: 2 }),
        );

        let report = session.run().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(report.samples, 0);
        assert!(report.windows.is_empty());
        assert!(report.records.is_empty());
    }

    #[test]
    fn test_sensor_fault_abandons_partial_window() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(0));
        let stored = Arc::new(Mutex::new(Vec::new()));
        let audit = create_shared_log();
        let mut publisher = ResultPublisher::connect(
            Box::new(RecordingSink {
                stored: stored.clone(),
            }),
            None,
        )
        .with_audit(audit.clone());
        // Three frames, window of two: one full window, then one pending reading.
        let source = ReplaySource::new(vec![VoltageFrame::new(0.3, 1.0, 0.5); 3]);

        let mut session = SessionLoop::new(
            source,
            &adapter,
            &mut publisher,
            ShutdownSignal::new(),
            quick_config(EmissionMode::Continuous { window_size: 2 }),
        )
        .with_audit(audit.clone());

        let err = session.run().unwrap_err();
        assert!(matches!(err, SessionError::Sensor(SensorError::Exhausted { .. })));
        assert_eq!(session.state(), SessionState::Faulted);

        // Only the full window reached the sink; the third reading was dropped.
        assert_eq!(*stored.lock().unwrap(), vec![2]);
        let stats = audit.stats();
        assert_eq!(stats.readings, 3);
        assert_eq!(stats.windows_emitted, 1);
        assert_eq!(stats.records_persisted, 1);
        assert_eq!(stats.sessions_faulted, 1);
    }

    #[test]
    fn test_print_only_sink_reports_nothing_persisted() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(0));
        let audit = create_shared_log();
        let mut publisher =
            ResultPublisher::connect(Box::new(LogSink), None).with_audit(audit.clone());
        let source = ReplaySource::new(vec![
            VoltageFrame::new(0.20, 0.5, 0.3),
            VoltageFrame::new(0.22, 0.6, 0.4),
        ]);

        let mut config = quick_config(EmissionMode::SessionEnd);
        config.sample_limit = Some(2);

        let mut session =
            SessionLoop::new(source, &adapter, &mut publisher, ShutdownSignal::new(), config)
                .with_audit(audit.clone());
        let report = session.run().unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.persisted, 0);
        assert_eq!(report.dropped, 0);
        assert_eq!(audit.stats().records_persisted, 0);
        assert_eq!(audit.stats().predictions, 1);
    }

    #[test]
    fn test_invalid_label_faults_session() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(7));
        let mut publisher = ResultPublisher::log_only();
        let source = ReplaySource::new(vec![VoltageFrame::new(0.3, 1.0, 0.5); 2]);

        let mut session = SessionLoop::new(
            source,
            &adapter,
            &mut publisher,
            ShutdownSignal::new(),
            quick_config(EmissionMode::Continuous { window_size: 2 }),
        );

        assert_eq!(
            session.run().unwrap_err(),
            SessionError::Classification(ClassifierError::InvalidLabel(7))
        );
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn test_duration_bounds_session() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(1));
        let mut publisher = ResultPublisher::log_only();
        let source = ReplaySource::new(vec![VoltageFrame::new(0.3, 1.0, 0.5)]).looping(true);

        let mut config = quick_config(EmissionMode::SessionEnd);
        config.poll_interval = Duration::from_millis(5);
        config.session_duration = Some(Duration::from_millis(40));

        let mut session =
            SessionLoop::new(source, &adapter, &mut publisher, ShutdownSignal::new(), config);
        let report = session.run().unwrap();

        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert!(report.samples >= 1);
        assert_eq!(report.windows.len(), 1);
        assert_eq!(report.windows[0].sample_count as u64, report.samples);
    }

    #[test]
    fn test_is_finished() {
        let adapter = ClassifierAdapter::new(StandardScaler::identity(), FixedModel(1));
        let mut publisher = ResultPublisher::log_only();
        let mut config = quick_config(EmissionMode::SessionEnd);
        config.session_duration = Some(Duration::ZERO);

        let session = SessionLoop::new(
            ReplaySource::new(Vec::new()),
            &adapter,
            &mut publisher,
            ShutdownSignal::new(),
            config,
        );

        // A zero duration means "until cancelled".
        assert!(!session.is_finished(Duration::from_secs(3600), 1_000));
    }
}
