//! Cloud result sink: password sign-in plus a REST document store.
//!
//! Authentication uses the identity toolkit `signInWithPassword` endpoint;
//! each record becomes one Firestore document in the configured collection.

use crate::core::record::PersistedDocument;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Environment variable holding the sink password.
pub const PASSWORD_ENV: &str = "PHYSIO_SINK_PASSWORD";

/// Cloud sink configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Web API key for the identity endpoint
    pub api_key: String,
    /// Project that owns the document store
    pub project_id: String,
    /// Collection records are written to
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Account email; the password comes from [`PASSWORD_ENV`]
    pub email: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default = "default_store_base_url")]
    pub store_base_url: String,
}

fn default_collection() -> String {
    "SensorData".to_string()
}

fn default_auth_base_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_store_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

impl CloudConfig {
    pub fn new(
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            collection: default_collection(),
            email: email.into(),
            auth_base_url: default_auth_base_url(),
            store_base_url: default_store_base_url(),
        }
    }

    /// Get the password sign-in endpoint URL.
    pub fn sign_in_url(&self) -> String {
        format!(
            "{}/v1/accounts:signInWithPassword?key={}",
            self.auth_base_url, self.api_key
        )
    }

    /// Get the collection endpoint URL.
    pub fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.store_base_url, self.project_id, self.collection
        )
    }
}

/// Successful sign-in response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    pub id_token: String,
}

/// Error body returned by both endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

/// Encode a document using the store's typed field values.
pub fn document_fields(document: &PersistedDocument) -> serde_json::Value {
    let user_id = match &document.user_id {
        Some(id) => json!({ "stringValue": id }),
        None => json!({ "nullValue": null }),
    };

    json!({
        "fields": {
            "Timestamp": { "timestampValue": document.timestamp.to_rfc3339() },
            "userId": user_id,
            "Temperature": { "doubleValue": document.temperature },
            "ECG": { "doubleValue": document.ecg },
            "GSR": { "doubleValue": document.gsr },
            "Output": {
                "mapValue": {
                    "fields": {
                        "Emotion": { "stringValue": document.output.emotion.name() },
                        "Suggestion": { "stringValue": document.output.suggestion },
                    }
                }
            }
        }
    })
}

#[cfg(feature = "cloud")]
mod client {
    use super::*;
    use crate::core::record::ResultRecord;
    use crate::sink::{Credentials, Identity, ResultSink, SinkError};

    /// Async client for the identity and document endpoints.
    pub struct CloudClient {
        config: CloudConfig,
        client: reqwest::Client,
    }

    impl CloudClient {
        pub fn new(config: CloudConfig) -> Result<Self, SinkError> {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .map_err(|e| SinkError::Network(e.to_string()))?;

            Ok(Self { config, client })
        }

        /// Exchange email/password for a user id and bearer token.
        pub async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, SinkError> {
            let response = self
                .client
                .post(self.config.sign_in_url())
                .json(&json!({
                    "email": credentials.email,
                    "password": credentials.password,
                    "returnSecureToken": true,
                }))
                .send()
                .await
                .map_err(|e| SinkError::Network(e.to_string()))?;

            if !response.status().is_success() {
                let message = response
                    .json::<ErrorResponse>()
                    .await
                    .map(|e| e.error.message)
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SinkError::Auth(message));
            }

            let body: SignInResponse = response
                .json()
                .await
                .map_err(|e| SinkError::Serialization(e.to_string()))?;

            Ok(Identity {
                user_id: body.local_id,
                token: Some(body.id_token),
            })
        }

        /// Create one document in the configured collection.
        pub async fn create_document(
            &self,
            document: &PersistedDocument,
            identity: &Identity,
        ) -> Result<(), SinkError> {
            let token = identity.token.as_deref().ok_or(SinkError::NotAuthenticated)?;

            let response = self
                .client
                .post(self.config.documents_url())
                .header("Authorization", format!("Bearer {token}"))
                .json(&document_fields(document))
                .send()
                .await
                .map_err(|e| SinkError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SinkError::Server {
                    status: status.as_u16(),
                    message,
                });
            }

            Ok(())
        }
    }

    /// Blocking cloud sink for the synchronous session loop.
    pub struct CloudSink {
        inner: CloudClient,
        runtime: tokio::runtime::Runtime,
    }

    impl CloudSink {
        pub fn new(config: CloudConfig) -> Result<Self, SinkError> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| SinkError::Network(format!("Failed to create runtime: {e}")))?;

            Ok(Self {
                inner: CloudClient::new(config)?,
                runtime,
            })
        }
    }

    impl ResultSink for CloudSink {
        fn name(&self) -> &str {
            "cloud"
        }

        fn authenticate(
            &mut self,
            credentials: Option<&Credentials>,
        ) -> Result<Identity, SinkError> {
            let credentials = credentials
                .ok_or_else(|| SinkError::Auth(format!("no password set in {PASSWORD_ENV}")))?;
            self.runtime.block_on(self.inner.sign_in(credentials))
        }

        fn put(&mut self, record: &ResultRecord, identity: &Identity) -> Result<(), SinkError> {
            let mut document = record.to_document();
            document.user_id = Some(identity.user_id.clone());
            self.runtime
                .block_on(self.inner.create_document(&document, identity))
        }
    }
}

#[cfg(feature = "cloud")]
pub use client::{CloudClient, CloudSink};
