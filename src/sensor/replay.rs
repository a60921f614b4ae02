//! Replay of recorded channel voltages.
//!
//! Used for dry runs without hardware and for driving the pipeline in tests.
//! A frame is consumed channel by channel; asking for a channel that was
//! already read from the current frame advances to the next frame.

use crate::sensor::types::{Channel, SensorError, SensorSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One recorded sample, in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageFrame {
    pub temperature: f64,
    pub ecg: f64,
    pub gsr: f64,
}

impl VoltageFrame {
    pub fn new(temperature: f64, ecg: f64, gsr: f64) -> Self {
        Self {
            temperature,
            ecg,
            gsr,
        }
    }

    fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Ecg => self.ecg,
            Channel::Gsr => self.gsr,
        }
    }
}

/// Sensor source backed by a list of recorded frames.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<VoltageFrame>,
    cursor: usize,
    consumed: [bool; 3],
    looping: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<VoltageFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            consumed: [false; 3],
            looping: false,
        }
    }

    /// Load frames from a JSON array of `{temperature, ecg, gsr}` objects.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SensorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SensorError::io(Channel::Temperature, format!("{}: {e}", path.display()))
        })?;
        let frames: Vec<VoltageFrame> = serde_json::from_str(&content).map_err(|e| {
            SensorError::io(Channel::Temperature, format!("{}: {e}", path.display()))
        })?;
        Ok(Self::new(frames))
    }

    /// Restart from the first frame instead of failing when exhausted.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl SensorSource for ReplaySource {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64, SensorError> {
        if self.consumed[channel.index()] {
            self.cursor += 1;
            self.consumed = [false; 3];
        }

        if self.cursor >= self.frames.len() {
            if self.looping && !self.frames.is_empty() {
                self.cursor = 0;
            } else {
                return Err(SensorError::Exhausted { channel });
            }
        }

        self.consumed[channel.index()] = true;
        Ok(self.frames[self.cursor].get(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_advance_per_reading() {
        let mut source = ReplaySource::new(vec![
            VoltageFrame::new(0.20, 0.5, 0.3),
            VoltageFrame::new(0.22, 0.6, 0.4),
        ]);

        for expected in [0.5, 0.6] {
            source.read_voltage(Channel::Temperature).unwrap();
            assert_eq!(source.read_voltage(Channel::Ecg).unwrap(), expected);
            source.read_voltage(Channel::Gsr).unwrap();
        }

        assert_eq!(
            source.read_voltage(Channel::Temperature),
            Err(SensorError::Exhausted {
                channel: Channel::Temperature
            })
        );
    }

    #[test]
    fn test_looping_replay() {
        let mut source = ReplaySource::new(vec![VoltageFrame::new(0.3, 1.0, 2.0)]).looping(true);
        for _ in 0..3 {
            assert_eq!(source.read_voltage(Channel::Gsr).unwrap(), 2.0);
        }
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("physio-replay-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"temperature": 0.25, "ecg": 1.1, "gsr": 0.7}]"#,
        )
        .unwrap();

        let mut source = ReplaySource::from_file(&path).unwrap();
        assert_eq!(source.read_voltage(Channel::Temperature).unwrap(), 0.25);

        let _ = std::fs::remove_file(&path);
    }
}
