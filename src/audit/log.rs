//! Session audit log.
//!
//! Counts what the agent has sampled, classified and stored so an operator
//! can see at a glance whether results are actually being persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Audit counters for the current process.
#[derive(Debug)]
pub struct AuditLog {
    /// Number of sensor readings taken
    readings: AtomicU64,
    /// Number of averaged windows emitted
    windows_emitted: AtomicU64,
    /// Number of successful classifications
    predictions: AtomicU64,
    /// Number of records stored by a sink
    records_persisted: AtomicU64,
    /// Number of records a sink failed to store
    records_dropped: AtomicU64,
    /// Number of sessions that ended in a fault
    sessions_faulted: AtomicU64,
    /// Process start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            readings: AtomicU64::new(0),
            windows_emitted: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            records_persisted: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            sessions_faulted: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an audit log that resumes from and saves to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous audit stats: {e}");
        }

        log
    }

    pub fn record_reading(&self) {
        self.readings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window(&self) {
        self.windows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction(&self) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.records_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_fault(&self) {
        self.sessions_faulted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            readings: self.readings.load(Ordering::Relaxed),
            windows_emitted: self.windows_emitted.load(Ordering::Relaxed),
            predictions: self.predictions.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            sessions_faulted: self.sessions_faulted.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Readings taken: {}\n\
             - Windows emitted: {}\n\
             - Predictions made: {}\n\
             - Records persisted: {}\n\
             - Records dropped: {}\n\
             - Sessions faulted: {}\n\
             - Running for: {} seconds",
            stats.readings,
            stats.windows_emitted,
            stats.predictions,
            stats.records_persisted,
            stats.records_dropped,
            stats.sessions_faulted,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                readings: stats.readings,
                windows_emitted: stats.windows_emitted,
                predictions: stats.predictions,
                records_persisted: stats.records_persisted,
                records_dropped: stats.records_dropped,
                sessions_faulted: stats.sessions_faulted,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.readings.store(persisted.readings, Ordering::Relaxed);
                self.windows_emitted
                    .store(persisted.windows_emitted, Ordering::Relaxed);
                self.predictions
                    .store(persisted.predictions, Ordering::Relaxed);
                self.records_persisted
                    .store(persisted.records_persisted, Ordering::Relaxed);
                self.records_dropped
                    .store(persisted.records_dropped, Ordering::Relaxed);
                self.sessions_faulted
                    .store(persisted.sessions_faulted, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of audit counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub readings: u64,
    pub windows_emitted: u64,
    pub predictions: u64,
    pub records_persisted: u64,
    pub records_dropped: u64,
    pub sessions_faulted: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    readings: u64,
    windows_emitted: u64,
    predictions: u64,
    records_persisted: u64,
    records_dropped: u64,
    sessions_faulted: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared audit log.
pub type SharedAuditLog = Arc<AuditLog>;

pub fn create_shared_log() -> SharedAuditLog {
    Arc::new(AuditLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedAuditLog {
    Arc::new(AuditLog::with_persistence(path))
}
