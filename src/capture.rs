//! Labelled dataset capture.
//!
//! Records averaged windows for each emotion in an operator schedule and
//! writes them as CSV rows `Timestamp,Temperature,ECG,GSR,Emotion`. The
//! resulting file is the training input for the classifier artifacts.

use crate::audit::SharedAuditLog;
use crate::config::Config;
use crate::core::catalog::EmotionLabel;
use crate::core::session::SessionOutcome;
use crate::core::windowing::{AveragedTriple, WindowAverager};
use crate::sensor::{SensorError, SensorReader, SensorSource};
use crate::shutdown::ShutdownSignal;
use chrono_tz::Tz;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Column header of capture files.
pub const CSV_HEADER: [&str; 5] = ["Timestamp", "Temperature", "ECG", "GSR", "Emotion"];

/// What to record and how fast.
#[derive(Debug, Clone)]
pub struct CapturePlan {
    pub schedule: Vec<EmotionLabel>,
    /// Windows recorded per emotion
    pub samples_per_emotion: usize,
    pub window_size: usize,
    pub poll_interval: Duration,
    pub break_time: Duration,
    pub timezone: Tz,
}

impl CapturePlan {
    pub fn from_config(config: &Config) -> Result<Self, crate::config::ConfigError> {
        Ok(Self {
            schedule: config.capture.schedule.clone(),
            samples_per_emotion: config.capture.samples_per_emotion,
            window_size: config.window_size.max(1),
            poll_interval: config.poll_interval,
            break_time: config.capture.break_time,
            timezone: config.tz()?,
        })
    }

    /// Readings taken for each emotion.
    pub fn ticks_per_emotion(&self) -> usize {
        self.samples_per_emotion * self.window_size.max(1)
    }
}

#[derive(Debug, Serialize)]
struct CaptureRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "ECG")]
    ecg: f64,
    #[serde(rename = "GSR")]
    gsr: f64,
    #[serde(rename = "Emotion")]
    emotion: EmotionLabel,
}

/// Rows written for one emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmotionTally {
    pub emotion: EmotionLabel,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub outcome: SessionOutcome,
    pub readings: u64,
    pub tallies: Vec<EmotionTally>,
}

impl CaptureReport {
    pub fn rows(&self) -> usize {
        self.tallies.iter().map(|t| t.rows).sum()
    }
}

#[derive(Debug)]
pub enum CaptureError {
    Sensor(SensorError),
    Csv(String),
    Io(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Sensor(e) => write!(f, "Capture aborted: {e}"),
            CaptureError::Csv(e) => write!(f, "CSV error: {e}"),
            CaptureError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<SensorError> for CaptureError {
    fn from(e: SensorError) -> Self {
        CaptureError::Sensor(e)
    }
}

impl From<csv::Error> for CaptureError {
    fn from(e: csv::Error) -> Self {
        CaptureError::Csv(e.to_string())
    }
}

/// Runs a capture schedule against a sensor and a CSV destination.
pub struct DatasetCapture<S, W: Write> {
    reader: SensorReader<S>,
    writer: csv::Writer<W>,
    plan: CapturePlan,
    shutdown: ShutdownSignal,
    audit: Option<SharedAuditLog>,
    echo: bool,
}

impl<S: SensorSource> DatasetCapture<S, std::fs::File> {
    /// Capture into a new file at `path`, replacing any existing one.
    pub fn create(
        source: S,
        path: &Path,
        plan: CapturePlan,
        shutdown: ShutdownSignal,
    ) -> Result<Self, CaptureError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CaptureError::Io(e.to_string()))?;
        }
        let file = std::fs::File::create(path)
            .map_err(|e| CaptureError::Io(format!("{}: {e}", path.display())))?;
        Self::new(source, file, plan, shutdown)
    }
}

impl<S: SensorSource, W: Write> DatasetCapture<S, W> {
    /// Wrap `out` and write the header row.
    pub fn new(
        source: S,
        out: W,
        plan: CapturePlan,
        shutdown: ShutdownSignal,
    ) -> Result<Self, CaptureError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(CSV_HEADER)?;

        Ok(Self {
            reader: SensorReader::new(source),
            writer,
            plan,
            shutdown,
            audit: None,
            echo: false,
        })
    }

    pub fn with_audit(mut self, audit: SharedAuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Print progress to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Record the whole schedule, or until cancelled.
    ///
    /// Buffered rows are flushed on every exit path, including errors.
    pub fn run(&mut self) -> Result<CaptureReport, CaptureError> {
        let mut report = CaptureReport {
            outcome: SessionOutcome::Completed,
            readings: 0,
            tallies: Vec::with_capacity(self.plan.schedule.len()),
        };

        let result = self.record_schedule(&mut report);
        let flushed = self
            .writer
            .flush()
            .map_err(|e| CaptureError::Io(e.to_string()));

        match result {
            Ok(outcome) => {
                flushed?;
                report.outcome = outcome;
                tracing::info!(?outcome, rows = report.rows(), "capture ended");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, rows = report.rows(), "capture aborted");
                Err(e)
            }
        }
    }

    fn record_schedule(&mut self, report: &mut CaptureReport) -> Result<SessionOutcome, CaptureError> {
        let schedule = self.plan.schedule.clone();

        for (position, &emotion) in schedule.iter().enumerate() {
            tracing::info!(%emotion, "collecting data");
            if self.echo {
                println!("Collecting data for emotion: {emotion}");
            }

            report.tallies.push(EmotionTally { emotion, rows: 0 });
            let outcome = self.record_emotion(emotion, report)?;
            if outcome == SessionOutcome::Cancelled {
                return Ok(outcome);
            }

            if self.echo {
                println!("Completed data collection for {emotion}.");
            }

            let is_last = position + 1 == schedule.len();
            if !is_last {
                if self.echo {
                    println!("Taking a short break...\n");
                }
                if self.shutdown.wait(self.plan.break_time) {
                    return Ok(SessionOutcome::Cancelled);
                }
            }
        }

        Ok(SessionOutcome::Completed)
    }

    /// Partial windows are dropped when the emotion changes.
    fn record_emotion(
        &mut self,
        emotion: EmotionLabel,
        report: &mut CaptureReport,
    ) -> Result<SessionOutcome, CaptureError> {
        let mut averager = WindowAverager::new(self.plan.window_size);

        for _ in 0..self.plan.ticks_per_emotion() {
            if self.shutdown.is_triggered() {
                return Ok(SessionOutcome::Cancelled);
            }

            let reading = self.reader.read()?;
            report.readings += 1;
            if let Some(audit) = &self.audit {
                audit.record_reading();
            }

            if let Some(triple) = averager.push(&reading) {
                self.write_row(&triple, emotion)?;
                if let Some(tally) = report.tallies.last_mut() {
                    tally.rows += 1;
                }
            }

            if self.shutdown.wait(self.plan.poll_interval) {
                return Ok(SessionOutcome::Cancelled);
            }
        }

        Ok(SessionOutcome::Completed)
    }

    fn write_row(&mut self, triple: &AveragedTriple, emotion: EmotionLabel) -> Result<(), CaptureError> {
        let timestamp = triple
            .window_end
            .with_timezone(&self.plan.timezone)
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string();

        if self.echo {
            println!(
                "{timestamp}, Temp: {:.2}°C, ECG: {:.2}V, GSR: {:.2}V, Emotion: {emotion}",
                triple.temperature, triple.ecg, triple.gsr
            );
        }

        self.writer.serialize(CaptureRow {
            timestamp,
            temperature: triple.temperature,
            ecg: triple.ecg,
            gsr: triple.gsr,
            emotion,
        })?;

        if let Some(audit) = &self.audit {
            audit.record_window();
        }
        Ok(())
    }

    /// Finish writing and return the destination.
    pub fn into_inner(self) -> Result<W, CaptureError> {
        self.writer
            .into_inner()
            .map_err(|e| CaptureError::Io(e.to_string()))
    }
}
