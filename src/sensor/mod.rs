//! Sensor acquisition for the physiological channels.
//!
//! The ADC itself is abstracted behind [`SensorSource`]. On Linux the
//! [`IioSource`] reads the kernel IIO sysfs interface; [`ReplaySource`] plays
//! back recorded voltages on any platform.

pub mod guard;
pub mod reader;
pub mod replay;
pub mod types;

#[cfg(target_os = "linux")]
pub mod iio;

// Re-export commonly used types
pub use guard::{RetryingSource, TimedSource};
pub use reader::{voltage_to_celsius, SensorReader};
pub use replay::{ReplaySource, VoltageFrame};
pub use types::{Channel, ChannelMap, Reading, SensorError, SensorSource};

#[cfg(target_os = "linux")]
pub use iio::IioSource;
