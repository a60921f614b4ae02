//! Result persistence.
//!
//! A [`ResultSink`] stores classified records once authenticated. The
//! [`ResultPublisher`] wraps a sink and degrades to log-only output when
//! authentication fails or no sink is configured.

pub mod cloud;
pub mod jsonl;
pub mod publisher;

use crate::core::record::ResultRecord;

// Re-export commonly used types
pub use cloud::CloudConfig;
pub use jsonl::JsonlSink;
pub use publisher::ResultPublisher;

#[cfg(feature = "cloud")]
pub use cloud::{CloudClient, CloudSink};

/// Login credentials for sinks that require them.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// Bearer token for sinks that need one
    pub token: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
        }
    }
}

/// Capability that persists result records.
pub trait ResultSink {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Establish the identity records are stored under.
    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<Identity, SinkError>;

    /// Store one record. Never retried by callers.
    fn put(&mut self, record: &ResultRecord, identity: &Identity) -> Result<(), SinkError>;

    /// Whether a successful `put` means the record was stored.
    fn persists(&self) -> bool {
        true
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn authenticate(&mut self, credentials: Option<&Credentials>) -> Result<Identity, SinkError> {
        (**self).authenticate(credentials)
    }

    fn put(&mut self, record: &ResultRecord, identity: &Identity) -> Result<(), SinkError> {
        (**self).put(record, identity)
    }

    fn persists(&self) -> bool {
        (**self).persists()
    }
}

/// Print-only sink: every record is logged and nothing is stored.
///
/// Authenticates as the local device so records still carry an owner.
#[derive(Debug, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn authenticate(&mut self, _credentials: Option<&Credentials>) -> Result<Identity, SinkError> {
        Ok(Identity::new(device_id()))
    }

    fn put(&mut self, record: &ResultRecord, identity: &Identity) -> Result<(), SinkError> {
        tracing::debug!(
            user_id = %identity.user_id,
            emotion = %record.emotion,
            sample_count = record.sample_count,
            "record logged"
        );
        Ok(())
    }

    fn persists(&self) -> bool {
        false
    }
}

/// Identifier for this machine, derived from its hostname.
pub fn device_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("device-{hostname}")
}

/// Sink error types.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    /// Identity step failed
    Auth(String),
    /// `put` called without a usable identity
    NotAuthenticated,
    /// Local storage failure
    Io(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Auth(msg) => write!(f, "Authentication failed: {msg}"),
            SinkError::NotAuthenticated => write!(f, "Sink used before authentication"),
            SinkError::Io(msg) => write!(f, "Sink write error: {msg}"),
            SinkError::Network(msg) => write!(f, "Sink network error: {msg}"),
            SinkError::Server { status, message } => {
                write!(f, "Sink server error ({status}): {message}")
            }
            SinkError::Serialization(msg) => write!(f, "Sink serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}
