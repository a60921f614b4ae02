//! Window management for folding readings into averages.
//!
//! Readings are summed per channel until the window holds `window_size`
//! samples, at which point the unweighted mean is emitted and the sums reset.
//! No outlier rejection or clamping is applied.

use crate::sensor::Reading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-channel averages over one window.
///
/// `sample_count` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedTriple {
    /// Mean temperature in °C
    pub temperature: f64,
    /// Mean ECG voltage
    pub ecg: f64,
    /// Mean GSR voltage
    pub gsr: f64,
    /// Number of readings averaged
    pub sample_count: usize,
    /// Capture time of the first reading
    pub window_start: DateTime<Utc>,
    /// Capture time of the last reading
    pub window_end: DateTime<Utc>,
}

/// Running per-channel sums for the window being filled.
#[derive(Debug, Clone, Default)]
pub struct WindowAccumulator {
    temperature_sum: f64,
    ecg_sum: f64,
    gsr_sum: f64,
    count: usize,
    first_at: Option<DateTime<Utc>>,
    last_at: Option<DateTime<Utc>>,
}

impl WindowAccumulator {
    /// Add one reading to the sums.
    pub fn add(&mut self, reading: &Reading) {
        self.temperature_sum += reading.temperature;
        self.ecg_sum += reading.ecg;
        self.gsr_sum += reading.gsr;
        self.count += 1;
        self.first_at.get_or_insert(reading.captured_at);
        self.last_at = Some(reading.captured_at);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of the accumulated readings, or `None` for an empty window.
    pub fn mean(&self) -> Option<AveragedTriple> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f64;
        let start = self.first_at.unwrap_or_else(Utc::now);
        Some(AveragedTriple {
            temperature: self.temperature_sum / n,
            ecg: self.ecg_sum / n,
            gsr: self.gsr_sum / n,
            sample_count: self.count,
            window_start: start,
            window_end: self.last_at.unwrap_or(start),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Folds readings into [`AveragedTriple`]s.
///
/// A bounded averager emits every `window_size` readings. An unbounded one
/// only emits on [`flush`](Self::flush), which is how a whole session is
/// reduced to a single average.
#[derive(Debug, Clone)]
pub struct WindowAverager {
    /// Readings per window; `None` accumulates until flushed
    window_size: Option<usize>,
    accumulator: WindowAccumulator,
}

impl WindowAverager {
    /// Create an averager that emits every `window_size` readings.
    ///
    /// A size of 0 is treated as 1.
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: Some(window_size.max(1)),
            accumulator: WindowAccumulator::default(),
        }
    }

    /// Create an averager that accumulates until flushed.
    pub fn unbounded() -> Self {
        Self {
            window_size: None,
            accumulator: WindowAccumulator::default(),
        }
    }

    pub fn window_size(&self) -> Option<usize> {
        self.window_size
    }

    /// Fold in one reading, returning the average if this completed a window.
    pub fn push(&mut self, reading: &Reading) -> Option<AveragedTriple> {
        self.accumulator.add(reading);

        match self.window_size {
            Some(size) if self.accumulator.count() >= size => self.complete_current_window(),
            _ => None,
        }
    }

    /// Force completion of the current partial window.
    ///
    /// Returns `None` when no readings are pending.
    pub fn flush(&mut self) -> Option<AveragedTriple> {
        self.complete_current_window()
    }

    /// Number of readings in the current partial window.
    pub fn pending(&self) -> usize {
        self.accumulator.count()
    }

    /// Drop the partial window.
    pub fn reset(&mut self) {
        self.accumulator.reset();
    }

    fn complete_current_window(&mut self) -> Option<AveragedTriple> {
        let triple = self.accumulator.mean();
        self.accumulator.reset();
        triple
    }
}
