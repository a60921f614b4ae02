//! Local document store: one JSON document per line.

use crate::core::record::{PersistedDocument, ResultRecord};
use crate::sink::{device_id, Credentials, Identity, ResultSink, SinkError};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A stored line: generated document id plus the persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    #[serde(flatten)]
    pub document: PersistedDocument,
}

/// Appends records to a JSON Lines file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    user_id: Option<String>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            user_id: None,
        }
    }

    /// Store records under a fixed owner instead of the device id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every stored document.
    pub fn read_all(&self) -> Result<Vec<StoredDocument>, SinkError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| SinkError::Io(e.to_string()))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| SinkError::Serialization(e.to_string()))
            })
            .collect()
    }
}

impl ResultSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn authenticate(&mut self, _credentials: Option<&Credentials>) -> Result<Identity, SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::Io(e.to_string()))?;
        }

        let user_id = self.user_id.clone().unwrap_or_else(device_id);
        Ok(Identity::new(user_id))
    }

    fn put(&mut self, record: &ResultRecord, identity: &Identity) -> Result<(), SinkError> {
        let mut document = record.to_document();
        document.user_id = Some(identity.user_id.clone());

        let stored = StoredDocument {
            id: Uuid::new_v4(),
            document,
        };
        let line =
            serde_json::to_string(&stored).map_err(|e| SinkError::Serialization(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::Io(format!("{}: {e}", self.path.display())))?;
        writeln!(file, "{line}").map_err(|e| SinkError::Io(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::EmotionLabel;
    use crate::core::record::Prediction;
    use crate::core::windowing::AveragedTriple;
    use chrono::Utc;

    #[test]
    fn test_appends_documents() {
        let path = std::env::temp_dir()
            .join(format!("physio-jsonl-{}", std::process::id()))
            .join("results.jsonl");
        let _ = std::fs::remove_file(&path);

        let mut sink = JsonlSink::new(&path).with_user_id("uid-7");
        let identity = sink.authenticate(None).unwrap();
        assert_eq!(identity.user_id, "uid-7");

        let now = Utc::now();
        let triple = AveragedTriple {
            temperature: 36.0,
            ecg: 1.4,
            gsr: 0.9,
            sample_count: 10,
            window_start: now,
            window_end: now,
        };
        for label in [EmotionLabel::Angry, EmotionLabel::Happy] {
            let record = ResultRecord::new(
                &triple,
                Prediction {
                    label,
                    confidence: None,
                },
                None,
            );
            sink.put(&record, &identity).unwrap();
        }

        let stored = sink.read_all().unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
        assert_eq!(stored[0].document.output.emotion, EmotionLabel::Angry);
        assert_eq!(stored[1].document.user_id.as_deref(), Some("uid-7"));

        let line = std::fs::read_to_string(&path).unwrap();
        let first: serde_json::Value = serde_json::from_str(line.lines().next().unwrap()).unwrap();
        assert_eq!(first["Output"]["Suggestion"], "Take deep breaths and try stepping away.");
        assert!(first.get("id").is_some());

        let _ = std::fs::remove_file(&path);
    }
}
