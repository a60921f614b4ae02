//! Physio Emotion Agent CLI
//!
//! Emotional state estimation from skin temperature, ECG and GSR.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use physio_emotion_agent::{
    audit::{create_shared_log_with_persistence, AuditLog, SharedAuditLog},
    capture::{CapturePlan, DatasetCapture},
    classifier::ClassifierAdapter,
    config::{Config, SensorBackend, SinkBackend},
    core::{EmissionMode, SessionConfig, SessionLoop, SessionOutcome},
    sensor::{ReplaySource, RetryingSource, SensorSource, TimedSource},
    shutdown::ShutdownSignal,
    sink::{JsonlSink, LogSink, ResultPublisher},
    VERSION,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "physio-emotion")]
#[command(version = VERSION)]
#[command(about = "Emotional state estimation from physiological sensors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live prediction session
    Predict {
        /// Session length in seconds (0 runs until Ctrl+C)
        #[arg(long)]
        duration: Option<u64>,

        /// Seconds between sensor reads
        #[arg(long)]
        interval: Option<u64>,

        /// Classify every window instead of once per session
        #[arg(long)]
        continuous: bool,

        /// Readings per window in continuous mode
        #[arg(long)]
        window: Option<usize>,

        /// Where results go (log, jsonl or cloud)
        #[arg(long)]
        sink: Option<SinkBackend>,

        /// Replay recorded voltages instead of reading the ADC
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Record a labelled training dataset
    Capture {
        /// CSV file to write
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Windows recorded per emotion
        #[arg(long)]
        samples: Option<usize>,

        /// Readings per window
        #[arg(long)]
        window: Option<usize>,

        /// Seconds of rest between emotions
        #[arg(long = "break")]
        break_secs: Option<u64>,

        /// Replay recorded voltages instead of reading the ADC
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Show cumulative statistics
    Status,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Predict {
            duration,
            interval,
            continuous,
            window,
            sink,
            replay,
        } => cmd_predict(duration, interval, continuous, window, sink, replay),
        Commands::Capture {
            output,
            samples,
            window,
            break_secs,
            replay,
        } => cmd_capture(output, samples, window, break_secs, replay),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_predict(
    duration: Option<u64>,
    interval: Option<u64>,
    continuous: bool,
    window: Option<usize>,
    sink: Option<SinkBackend>,
    replay: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    if let Some(secs) = duration {
        config.session_duration = Duration::from_secs(secs);
    }
    if let Some(secs) = interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(size) = window {
        config.window_size = size;
    }
    if let Some(backend) = sink {
        config.sink.backend = backend;
    }
    let timezone = config.tz()?;

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Physio Emotion Agent v{VERSION}");
    println!();

    let classifier = ClassifierAdapter::load(&config.scaler_path, &config.model_path)
        .context("loading classifier artifacts")?;

    let audit = create_shared_log_with_persistence(config.audit_path());
    let source = open_sensor(&config, replay.as_deref())?;
    let mut publisher = connect_publisher(&config, audit.clone());

    let shutdown = ShutdownSignal::new();
    shutdown
        .install_ctrlc_handler()
        .context("installing Ctrl+C handler")?;

    let mode = if continuous {
        EmissionMode::Continuous {
            window_size: config.window_size,
        }
    } else {
        EmissionMode::SessionEnd
    };

    println!("Starting session...");
    println!("  Sink: {:?}", config.sink.backend);
    println!("  Poll interval: {}s", config.poll_interval.as_secs());
    match config.session_limit() {
        Some(limit) => println!("  Duration: {}s", limit.as_secs()),
        None => println!("  Duration: until interrupted"),
    }
    if let EmissionMode::Continuous { window_size } = mode {
        println!("  Window: {window_size} readings");
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let session_config = SessionConfig {
        poll_interval: config.poll_interval,
        session_duration: config.session_limit(),
        sample_limit: None,
        mode,
        echo: true,
        timezone,
    };

    let result = SessionLoop::new(source, &classifier, &mut publisher, shutdown, session_config)
        .with_audit(audit.clone())
        .run();

    if let Err(e) = audit.save() {
        eprintln!("Warning: Could not save audit log: {e}");
    }

    let report = result?;
    if report.outcome == SessionOutcome::Cancelled {
        println!();
        println!("Session interrupted.");
    }

    if !report.records.is_empty() {
        export_records(&config, &report.records);
    }

    println!();
    println!("{}", audit.summary());
    Ok(())
}

fn cmd_capture(
    output: Option<PathBuf>,
    samples: Option<usize>,
    window: Option<usize>,
    break_secs: Option<u64>,
    replay: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    if let Some(path) = output {
        config.capture.output_path = path;
    }
    if let Some(n) = samples {
        config.capture.samples_per_emotion = n;
    }
    if let Some(size) = window {
        config.window_size = size;
    }
    if let Some(secs) = break_secs {
        config.capture.break_time = Duration::from_secs(secs);
    }

    let plan = CapturePlan::from_config(&config)?;
    let audit = create_shared_log_with_persistence(config.audit_path());
    let source = open_sensor(&config, replay.as_deref())?;

    let shutdown = ShutdownSignal::new();
    shutdown
        .install_ctrlc_handler()
        .context("installing Ctrl+C handler")?;

    let output_path = config.capture.output_path.clone();
    let delay = config.capture.start_delay;
    println!("Starting in {} seconds...", delay.as_secs());
    if shutdown.wait(delay) {
        println!("Interrupted before capture started.");
        return Ok(());
    }
    println!("Starting data collection...");

    let result = DatasetCapture::create(source, &output_path, plan, shutdown).and_then(|capture| {
        let mut capture = capture.with_audit(audit.clone()).with_echo(true);
        capture.run()
    });

    if let Err(e) = audit.save() {
        eprintln!("Warning: Could not save audit log: {e}");
    }

    let report = result.with_context(|| format!("capturing to {}", output_path.display()))?;
    if report.outcome == SessionOutcome::Cancelled {
        println!("Keyboard interrupt detected, exiting...");
    }
    println!(
        "Data collection complete. {} rows saved to '{}'",
        report.rows(),
        output_path.display()
    );
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Physio Emotion Agent Status");
    println!("===========================");
    println!();

    println!("Artifacts:");
    println!("  Scaler: {}", artifact_state(&config.scaler_path));
    println!("  Model: {}", artifact_state(&config.model_path));
    println!();

    println!("Configuration:");
    println!("  Sensor backend: {:?}", config.sensor.backend);
    println!("  Sink backend: {:?}", config.sink.backend);
    println!("  Poll interval: {}s", config.poll_interval.as_secs());
    println!("  Window size: {}", config.window_size);
    println!();

    let audit_path = config.audit_path();
    if audit_path.exists() {
        let stats = AuditLog::with_persistence(audit_path).stats();
        println!("Cumulative Statistics:");
        println!("  Readings taken: {}", stats.readings);
        println!("  Windows emitted: {}", stats.windows_emitted);
        println!("  Predictions made: {}", stats.predictions);
        println!("  Records persisted: {}", stats.records_persisted);
        println!("  Records dropped: {}", stats.records_dropped);
        println!("  Sessions faulted: {}", stats.sessions_faulted);
    } else {
        println!("No previous session data found.");
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn artifact_state(path: &Path) -> String {
    if path.exists() {
        format!("{} ✓", path.display())
    } else {
        format!("{} (missing) ✗", path.display())
    }
}

/// Build the configured sensor source with its optional timeout and retry wrappers.
fn open_sensor(config: &Config, replay: Option<&Path>) -> Result<Box<dyn SensorSource + Send>> {
    let base: Box<dyn SensorSource + Send> = match (replay, config.sensor.backend) {
        (Some(path), _) => Box::new(
            ReplaySource::from_file(path)
                .with_context(|| format!("loading replay {}", path.display()))?,
        ),
        (None, SensorBackend::Replay) => {
            let Some(path) = config.sensor.replay_path.as_deref() else {
                bail!("replay backend selected but sensor.replay_path is not set");
            };
            Box::new(
                ReplaySource::from_file(path)
                    .with_context(|| format!("loading replay {}", path.display()))?,
            )
        }
        (None, SensorBackend::Iio) => open_iio(config)?,
    };

    let timed: Box<dyn SensorSource + Send> = match config.sensor.read_timeout() {
        Some(timeout) => Box::new(TimedSource::spawn(base, timeout)),
        None => base,
    };

    Ok(match config.sensor.read_retries {
        0 => timed,
        retries => Box::new(RetryingSource::new(timed, retries)),
    })
}

#[cfg(target_os = "linux")]
fn open_iio(config: &Config) -> Result<Box<dyn SensorSource + Send>> {
    let source = physio_emotion_agent::sensor::IioSource::open(
        &config.sensor.iio_device,
        config.sensor.channels,
    )
    .with_context(|| format!("opening ADC at {}", config.sensor.iio_device.display()))?;
    Ok(Box::new(source))
}

#[cfg(not(target_os = "linux"))]
fn open_iio(_config: &Config) -> Result<Box<dyn SensorSource + Send>> {
    bail!("the iio sensor backend is only available on Linux; use --replay")
}

/// Wrap the configured sink; authentication failures demote to log-only.
fn connect_publisher(config: &Config, audit: SharedAuditLog) -> ResultPublisher {
    let publisher = match config.sink.backend {
        SinkBackend::Log => ResultPublisher::connect(Box::new(LogSink), None),
        SinkBackend::Jsonl => {
            ResultPublisher::connect(Box::new(JsonlSink::new(&config.sink.jsonl_path)), None)
        }
        SinkBackend::Cloud => connect_cloud(config),
    };

    if let Some(e) = publisher.auth_error() {
        eprintln!("Warning: {e}");
        eprintln!("Results will be shown but not saved.");
    }

    publisher.with_audit(audit)
}

#[cfg(feature = "cloud")]
fn connect_cloud(config: &Config) -> ResultPublisher {
    use physio_emotion_agent::sink::CloudSink;

    let Some(cloud) = config.sink.cloud.clone() else {
        eprintln!("Warning: cloud sink selected but sink.cloud is not configured");
        return ResultPublisher::log_only();
    };

    match CloudSink::new(cloud) {
        Ok(sink) => ResultPublisher::connect(Box::new(sink), config.sink.credentials().as_ref()),
        Err(e) => {
            eprintln!("Warning: Cloud sink initialization failed: {e}");
            ResultPublisher::log_only()
        }
    }
}

#[cfg(not(feature = "cloud"))]
fn connect_cloud(_config: &Config) -> ResultPublisher {
    eprintln!("Warning: cloud sink ignored (cloud feature not enabled at compile time)");
    ResultPublisher::log_only()
}

fn export_records(config: &Config, records: &[physio_emotion_agent::ResultRecord]) {
    let export_path = config.export_path.join(format!(
        "session_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    match serde_json::to_string_pretty(records) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&export_path, json) {
                eprintln!("Error writing session report: {e}");
            } else {
                println!("Exported {} results to {:?}", records.len(), export_path);
            }
        }
        Err(e) => eprintln!("Error serializing session report: {e}"),
    }
}
