//! Sensor channel and reading types.
//!
//! A [`Reading`] is one instantaneous sample of all three channels, already
//! converted to physical units by the [`SensorReader`](super::SensorReader).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The three physiological channels wired to the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// LM35-style skin temperature sensor (10 mV/°C)
    Temperature,
    /// AD8232 ECG front end
    Ecg,
    /// Galvanic skin response electrodes
    Gsr,
}

impl Channel {
    /// All channels in feature order.
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Ecg, Channel::Gsr];

    /// Position of this channel in feature order.
    pub fn index(self) -> usize {
        match self {
            Channel::Temperature => 0,
            Channel::Ecg => 1,
            Channel::Gsr => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Ecg => "ecg",
            Channel::Gsr => "gsr",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from physiological channel to ADC input number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub temperature: u8,
    pub ecg: u8,
    pub gsr: u8,
}

impl Default for ChannelMap {
    /// Wiring used by the reference board: ECG on A0, temperature on A1, GSR on A2.
    fn default() -> Self {
        Self {
            temperature: 1,
            ecg: 0,
            gsr: 2,
        }
    }
}

impl ChannelMap {
    pub fn input(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Ecg => self.ecg,
            Channel::Gsr => self.gsr,
        }
    }
}

/// One sample of all three channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Skin temperature in °C
    pub temperature: f64,
    /// ECG voltage in volts
    pub ecg: f64,
    /// GSR voltage in volts
    pub gsr: f64,
    /// When the sample was taken
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(temperature: f64, ecg: f64, gsr: f64) -> Self {
        Self {
            temperature,
            ecg,
            gsr,
            captured_at: Utc::now(),
        }
    }
}

/// Errors raised while reading a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// The underlying device failed to produce a value
    Io { channel: Channel, message: String },
    /// A read did not complete within the configured bound
    Timeout { channel: Channel, after: Duration },
    /// A replayed recording has no more frames
    Exhausted { channel: Channel },
}

impl SensorError {
    pub fn io(channel: Channel, message: impl Into<String>) -> Self {
        SensorError::Io {
            channel,
            message: message.into(),
        }
    }

    /// The channel the failed read was addressed to.
    pub fn channel(&self) -> Channel {
        match self {
            SensorError::Io { channel, .. }
            | SensorError::Timeout { channel, .. }
            | SensorError::Exhausted { channel } => *channel,
        }
    }

    /// Whether repeating the same read may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SensorError::Io { .. } | SensorError::Timeout { .. })
    }
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Io { channel, message } => {
                write!(f, "Sensor fault on {channel} channel: {message}")
            }
            SensorError::Timeout { channel, after } => {
                write!(
                    f,
                    "Sensor timeout on {channel} channel after {}ms",
                    after.as_millis()
                )
            }
            SensorError::Exhausted { channel } => {
                write!(f, "Sensor fault on {channel} channel: recording exhausted")
            }
        }
    }
}

impl std::error::Error for SensorError {}

/// Capability that yields a raw voltage for a channel on demand.
pub trait SensorSource {
    /// Read the current voltage of `channel`, in volts.
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError>;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
        (**self).read_voltage(channel)
    }
}
