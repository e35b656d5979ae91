//! Filter configuration
//!
//! Smoothing window, frequency cap and the threshold bands used by the
//! classifier. Every field has a default, so a partial JSON document only
//! overrides what it names.

use crate::error::GaitError;
use serde::{Deserialize, Serialize};

/// Default effective smoothing window (samples)
pub const DEFAULT_MAX_HISTORY_WINDOW: usize = 1;

/// Default frequency cap (Hz). Roughly four arm swings per second.
pub const DEFAULT_MAX_FREQUENCY: f64 = 4.0;

/// Half-open interval `[low, high)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }
}

/// Threshold bands for motion classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    /// Energy strictly above this is sprinting, whatever the frequency
    pub sprint_energy_min: f64,
    /// Frequency band for running (Hz)
    pub run_frequency: Range,
    /// Minimum energy for running
    pub run_energy_min: f64,
    /// Frequency band for walking (Hz)
    pub walk_frequency: Range,
    /// Energy band for walking
    pub walk_energy: Range,
    /// Energy strictly below this is standing
    pub standing_energy_max: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            sprint_energy_min: 800.0,
            run_frequency: Range::new(1.3, 2.0),
            run_energy_min: 500.0,
            walk_frequency: Range::new(0.3, 1.3),
            walk_energy: Range::new(100.0, 500.0),
            standing_energy_max: 100.0,
        }
    }
}

impl BandThresholds {
    fn validate(&self) -> Result<(), GaitError> {
        let scalars = [
            ("sprint_energy_min", self.sprint_energy_min),
            ("run_energy_min", self.run_energy_min),
            ("standing_energy_max", self.standing_energy_max),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(GaitError::InvalidConfig(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        let ranges = [
            ("run_frequency", self.run_frequency),
            ("walk_frequency", self.walk_frequency),
            ("walk_energy", self.walk_energy),
        ];
        for (name, range) in ranges {
            if !(range.low.is_finite() && range.high.is_finite()) || range.low >= range.high {
                return Err(GaitError::InvalidConfig(format!(
                    "{} must satisfy low < high, got [{}, {})",
                    name, range.low, range.high
                )));
            }
        }

        Ok(())
    }
}

/// Complete filter configuration, fixed for the lifetime of a processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Cap on the history count used for bias-weighted averaging
    pub max_history_window: usize,
    /// Cap on the average frequency (Hz)
    pub max_frequency: f64,
    /// Classification bands
    pub bands: BandThresholds,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            max_history_window: DEFAULT_MAX_HISTORY_WINDOW,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            bands: BandThresholds::default(),
        }
    }
}

impl GaitConfig {
    pub fn with_max_history_window(mut self, window: usize) -> Self {
        self.max_history_window = window;
        self
    }

    pub fn with_max_frequency(mut self, max_frequency: f64) -> Self {
        self.max_frequency = max_frequency;
        self
    }

    pub fn with_bands(mut self, bands: BandThresholds) -> Self {
        self.bands = bands;
        self
    }

    /// Check that the configuration describes a usable filter
    pub fn validate(&self) -> Result<(), GaitError> {
        if self.max_history_window == 0 {
            return Err(GaitError::InvalidConfig(
                "max_history_window must be at least 1".to_string(),
            ));
        }
        if !(self.max_frequency.is_finite() && self.max_frequency > 0.0) {
            return Err(GaitError::InvalidConfig(format!(
                "max_frequency must be positive, got {}",
                self.max_frequency
            )));
        }
        self.bands.validate()
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, GaitError> {
        let config: GaitConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
