//! Demonstration of the emotion pipeline without sensor hardware.
//!
//! This example shows how to:
//! 1. Build a classifier from in-memory scaler and model artifacts
//! 2. Replay recorded channel voltages
//! 3. Run a continuous session that classifies every window
//! 4. Inspect the audit counters
//!
//! Run with: cargo run --example replay_demo

use std::time::Duration;

use physio_emotion_agent::{
    audit::create_shared_log,
    classifier::{ClassifierAdapter, ModelArtifact, StandardScaler},
    core::{EmissionMode, SessionConfig, SessionLoop},
    sensor::{ReplaySource, VoltageFrame},
    shutdown::ShutdownSignal,
    sink::{LogSink, ResultPublisher},
};

fn main() {
    println!("Physio Emotion Agent - Replay Demo");
    println!("==================================");
    println!();

    // Centroids in standardised units for three of the six emotions.
    let scaler = StandardScaler::new([30.0, 1.0, 0.6], [5.0, 0.5, 0.3]);
    let model = ModelArtifact::NearestCentroid {
        classes: vec![0, 2, 5],
        centroids: vec![[-1.8, -0.9, -0.8], [0.0, 0.0, 0.0], [1.4, 1.2, 1.5]],
    };
    let classifier = ClassifierAdapter::new(scaler, model);

    // Three phases of five readings each: relaxed, settled, agitated.
    let mut frames = Vec::new();
    for (temperature, ecg, gsr) in [(0.21, 0.55, 0.36), (0.30, 1.0, 0.6), (0.37, 1.6, 1.05)] {
        for step in 0..5 {
            let jitter = f64::from(step) * 0.002;
            frames.push(VoltageFrame::new(temperature + jitter, ecg + jitter, gsr - jitter));
        }
    }
    let source = ReplaySource::new(frames);

    let audit = create_shared_log();
    let mut publisher = ResultPublisher::connect(Box::new(LogSink), None).with_audit(audit.clone());

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.install_ctrlc_handler() {
        eprintln!("Warning: Could not install Ctrl+C handler: {e}");
    }

    let config = SessionConfig {
        poll_interval: Duration::from_millis(200),
        session_duration: None,
        sample_limit: Some(15),
        mode: EmissionMode::Continuous { window_size: 5 },
        echo: true,
        timezone: chrono_tz::Tz::UTC,
    };

    println!("Replaying 15 readings in windows of 5...");
    println!();

    let mut session = SessionLoop::new(source, &classifier, &mut publisher, shutdown, config)
        .with_audit(audit.clone());

    match session.run() {
        Ok(report) => {
            println!();
            println!("Session {:?}: {} results", report.outcome, report.records.len());
            for record in &report.records {
                println!("  {} -> {}", record.emotion, record.suggestion);
            }
        }
        Err(e) => eprintln!("Session failed: {e}"),
    }

    println!();
    println!("{}", audit.summary());
}
