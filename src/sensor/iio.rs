//! Linux IIO sysfs sensor source.
//!
//! ADCs such as the ADS1115 are exposed by the kernel (`ti-ads1015` driver)
//! under `/sys/bus/iio/devices/iio:deviceN`. Each input has a raw count file
//! and a scale file in millivolts per count.

use crate::sensor::types::{Channel, ChannelMap, SensorError, SensorSource};
use std::path::{Path, PathBuf};

/// Reads voltages from an IIO device directory.
#[derive(Debug)]
pub struct IioSource {
    device_dir: PathBuf,
    map: ChannelMap,
    /// Millivolts per raw count, indexed by [`Channel::index`]
    scales: [f64; 3],
}

impl IioSource {
    /// Open an IIO device and cache the per-channel scale.
    pub fn open(device_dir: impl Into<PathBuf>, map: ChannelMap) -> Result<Self, SensorError> {
        let device_dir = device_dir.into();
        let mut scales = [0.0; 3];

        for channel in Channel::ALL {
            scales[channel.index()] = read_scale(&device_dir, map.input(channel), channel)?;
        }

        Ok(Self {
            device_dir,
            map,
            scales,
        })
    }
}

impl SensorSource for IioSource {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
        let input = self.map.input(channel);
        let path = self.device_dir.join(format!("in_voltage{input}_raw"));
        let raw = read_number(&path, channel)?;

        Ok(raw * self.scales[channel.index()] / 1000.0)
    }
}

/// Per-input scale, falling back to the shared `in_voltage_scale` file.
fn read_scale(device_dir: &Path, input: u8, channel: Channel) -> Result<f64, SensorError> {
    let specific = device_dir.join(format!("in_voltage{input}_scale"));
    if specific.exists() {
        return read_number(&specific, channel);
    }
    read_number(&device_dir.join("in_voltage_scale"), channel)
}

fn read_number(path: &Path, channel: Channel) -> Result<f64, SensorError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SensorError::io(channel, format!("{}: {e}", path.display())))?;

    content.trim().parse::<f64>().map_err(|e| {
        SensorError::io(
            channel,
            format!("{}: invalid value '{}': {e}", path.display(), content.trim()),
        )
    })
}
