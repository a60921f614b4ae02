//! Sink wrapper that handles authentication and degraded operation.

use crate::audit::SharedAuditLog;
use crate::core::record::ResultRecord;
use crate::sink::{Credentials, Identity, ResultSink, SinkError};

/// What happened to a published record.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Stored by the sink
    Persisted,
    /// No authenticated sink, or a print-only one; the record was only logged
    LogOnly,
    /// The sink rejected the record; it is lost
    Dropped(SinkError),
}

/// Hands records to a sink when one is authenticated, logs them otherwise.
pub struct ResultPublisher {
    sink: Option<Box<dyn ResultSink>>,
    identity: Option<Identity>,
    auth_error: Option<SinkError>,
    audit: Option<SharedAuditLog>,
}

impl ResultPublisher {
    /// A publisher that never persists.
    pub fn log_only() -> Self {
        Self {
            sink: None,
            identity: None,
            auth_error: None,
            audit: None,
        }
    }

    /// Authenticate `sink` and wrap it.
    ///
    /// Authentication failure is not fatal: the publisher falls back to
    /// log-only output and remembers the error.
    pub fn connect(mut sink: Box<dyn ResultSink>, credentials: Option<&Credentials>) -> Self {
        match sink.authenticate(credentials) {
            Ok(identity) => {
                tracing::info!(sink = sink.name(), user_id = %identity.user_id, "sink authenticated");
                Self {
                    sink: Some(sink),
                    identity: Some(identity),
                    auth_error: None,
                    audit: None,
                }
            }
            Err(e) => {
                tracing::warn!(sink = sink.name(), error = %e, "authentication failed, results will not be persisted");
                Self {
                    sink: None,
                    identity: None,
                    auth_error: Some(e),
                    audit: None,
                }
            }
        }
    }

    pub fn with_audit(mut self, audit: SharedAuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Owner id to stamp on new records.
    pub fn owner_id(&self) -> Option<String> {
        self.identity.as_ref().map(|i| i.user_id.clone())
    }

    pub fn is_persisting(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| sink.persists())
    }

    /// The authentication error that demoted this publisher, if any.
    pub fn auth_error(&self) -> Option<&SinkError> {
        self.auth_error.as_ref()
    }

    /// Log `record` and store it if a sink is authenticated.
    ///
    /// Sink failures are logged and counted; they never abort the caller.
    pub fn publish(&mut self, record: &ResultRecord) -> PublishOutcome {
        tracing::info!(
            emotion = %record.emotion,
            suggestion = %record.suggestion,
            temperature = record.temperature,
            ecg = record.ecg,
            gsr = record.gsr,
            "classified window"
        );

        let (Some(sink), Some(identity)) = (self.sink.as_mut(), self.identity.as_ref()) else {
            return PublishOutcome::LogOnly;
        };

        match sink.put(record, identity) {
            Ok(()) if !sink.persists() => PublishOutcome::LogOnly,
            Ok(()) => {
                if let Some(audit) = &self.audit {
                    audit.record_persisted();
                }
                tracing::debug!(sink = sink.name(), "record persisted");
                PublishOutcome::Persisted
            }
            Err(e) => {
                if let Some(audit) = &self.audit {
                    audit.record_dropped();
                }
                tracing::warn!(sink = sink.name(), error = %e, "failed to persist record");
                PublishOutcome::Dropped(e)
            }
        }
    }
}
