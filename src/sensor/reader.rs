//! Conversion of raw channel voltages into physical units.

use crate::sensor::types::{Channel, Reading, SensorError, SensorSource};
use chrono::Utc;

/// LM35 law: 10 mV per °C.
const MILLIVOLTS_PER_DEGREE: f64 = 10.0;

/// Convert a temperature sensor voltage to °C.
///
/// The value goes through a millivolt intermediate so the result matches the
/// sensor datasheet arithmetic exactly.
pub fn voltage_to_celsius(voltage: f64) -> f64 {
    (voltage * 1000.0) / MILLIVOLTS_PER_DEGREE
}

/// Reads the three channels from a [`SensorSource`].
///
/// Every `read_*` call hits the source exactly once. Failures propagate
/// immediately; there are no retries at this level.
pub struct SensorReader<S> {
    source: S,
}

impl<S: SensorSource> SensorReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Skin temperature in °C.
    pub fn read_temperature(&mut self) -> Result<f64, SensorError> {
        let voltage = self.source.read_voltage(Channel::Temperature)?;
        Ok(voltage_to_celsius(voltage))
    }

    /// ECG in volts.
    pub fn read_ecg(&mut self) -> Result<f64, SensorError> {
        self.source.read_voltage(Channel::Ecg)
    }

    /// GSR in volts.
    pub fn read_gsr(&mut self) -> Result<f64, SensorError> {
        self.source.read_voltage(Channel::Gsr)
    }

    /// Sample all three channels as one reading.
    pub fn read(&mut self) -> Result<Reading, SensorError> {
        let temperature = self.read_temperature()?;
        let ecg = self.read_ecg()?;
        let gsr = self.read_gsr()?;

        Ok(Reading {
            temperature,
            ecg,
            gsr,
            captured_at: Utc::now(),
        })
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
