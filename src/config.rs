//! Configuration for the physiological emotion agent.

use crate::core::catalog::EmotionLabel;
use crate::sensor::ChannelMap;
use crate::sink::cloud::{CloudConfig, PASSWORD_ENV};
use crate::sink::Credentials;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const APP_DIR: &str = "physio-emotion-agent";

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wait between sensor reads
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,

    /// Length of a prediction session; 0 runs until interrupted
    #[serde(with = "duration_serde")]
    pub session_duration: Duration,

    /// Readings per window in continuous and capture modes
    pub window_size: usize,

    /// Trained model artifact
    pub model_path: PathBuf,

    /// Fitted scaler artifact
    pub scaler_path: PathBuf,

    /// Path for exported session reports
    pub export_path: PathBuf,

    /// Path for storing audit stats
    pub data_path: PathBuf,

    /// IANA zone for timestamps shown to people
    pub timezone: String,

    pub sensor: SensorConfig,

    pub sink: SinkConfig,

    pub capture: CaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();

        Self {
            poll_interval: Duration::from_secs(6),
            session_duration: Duration::from_secs(60),
            window_size: 10,
            model_path: data_dir.join("final_emotion_model.json"),
            scaler_path: data_dir.join("scaler.json"),
            export_path: data_dir.join("exports"),
            data_path: data_dir.clone(),
            timezone: "UTC".to_string(),
            sensor: SensorConfig::default(),
            sink: SinkConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.tz()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Parsed display timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Session bound, `None` when sessions run until interrupted.
    pub fn session_limit(&self) -> Option<Duration> {
        (!self.session_duration.is_zero()).then_some(self.session_duration)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_path.join("audit.json")
    }
}

/// Where sensor voltages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackend {
    /// Linux IIO sysfs ADC
    Iio,
    /// Recorded voltages
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub backend: SensorBackend,

    /// IIO device directory
    pub iio_device: PathBuf,

    /// ADC input wired to each channel
    pub channels: ChannelMap,

    /// Recording used by the replay backend
    pub replay_path: Option<PathBuf>,

    /// Per-read timeout in milliseconds; 0 disables it
    pub read_timeout_ms: u64,

    /// Extra attempts for a failed read
    pub read_retries: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            backend: SensorBackend::Iio,
            iio_device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            channels: ChannelMap::default(),
            replay_path: None,
            read_timeout_ms: 0,
            read_retries: 0,
        }
    }
}

impl SensorConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

/// Where classified records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkBackend {
    /// Print and log only
    Log,
    /// Local JSON Lines file
    Jsonl,
    /// Hosted document store
    Cloud,
}

impl FromStr for SinkBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(SinkBackend::Log),
            "jsonl" => Ok(SinkBackend::Jsonl),
            "cloud" => Ok(SinkBackend::Cloud),
            other => Err(ConfigError::Parse(format!("unknown sink backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub backend: SinkBackend,

    /// Output file for the jsonl backend
    pub jsonl_path: PathBuf,

    /// Settings for the cloud backend
    pub cloud: Option<CloudConfig>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            backend: SinkBackend::Log,
            jsonl_path: data_dir().join("results.jsonl"),
            cloud: None,
        }
    }
}

impl SinkConfig {
    /// Cloud credentials: configured email plus the password from the environment.
    pub fn credentials(&self) -> Option<Credentials> {
        let cloud = self.cloud.as_ref()?;
        let password = std::env::var(PASSWORD_ENV).ok()?;
        Some(Credentials {
            email: cloud.email.clone(),
            password,
        })
    }
}

/// Labelled dataset capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Windows recorded per emotion
    pub samples_per_emotion: usize,

    /// Pause between emotions
    #[serde(with = "duration_serde")]
    pub break_time: Duration,

    /// Emotions in recording order
    pub schedule: Vec<EmotionLabel>,

    /// Wait before the first reading
    #[serde(with = "duration_serde")]
    pub start_delay: Duration,

    pub output_path: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            samples_per_emotion: 167,
            break_time: Duration::from_secs(60),
            schedule: EmotionLabel::ALL.to_vec(),
            start_delay: Duration::from_secs(10),
            output_path: data_dir().join("sensor_data.csv"),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
    InvalidTimezone(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Parse error: {e}"),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidTimezone(tz) => write!(f, "Unknown timezone: {tz}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
