//! Core types for the gait filter
//!
//! This module defines the data that flows through the filter: raw samples in,
//! smoothed estimates in the middle, and commands out.

use serde::{Deserialize, Serialize};

/// One sensor tick: the peak and trough amplitude seen since the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Tick timestamp (seconds)
    pub timestamp: f64,
    /// Peak amplitude
    pub peak: f64,
    /// Trough amplitude
    pub trough: f64,
}

impl Sample {
    pub fn new(timestamp: f64, peak: f64, trough: f64) -> Self {
        Self {
            timestamp,
            peak,
            trough,
        }
    }

    /// Peak-to-trough swing of this tick
    pub fn energy(&self) -> f64 {
        self.peak - self.trough
    }
}

/// Discrete motion label derived from smoothed frequency and energy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum MotionState {
    Standing = 0,
    Walking = 1,
    Running = 2,
    Sprinting = 3,
    #[default]
    Unknown = -1,
}

impl MotionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionState::Standing => "standing",
            MotionState::Walking => "walking",
            MotionState::Running => "running",
            MotionState::Sprinting => "sprinting",
            MotionState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smoothed averages after a sample has been folded in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Average oscillation frequency (Hz)
    pub frequency: f64,
    /// Average peak-to-trough energy
    pub energy: f64,
}

/// Snapshot sent to listeners when the motion state changes
///
/// Field names on the wire follow the companion app protocol (`bpm`, `gait`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Average frequency expressed per minute
    #[serde(rename = "bpm")]
    pub beats_per_minute: f64,
    /// New motion state
    #[serde(rename = "gait")]
    pub state: MotionState,
    /// Average energy
    pub energy: f64,
}

impl Command {
    pub fn from_estimate(estimate: Estimate, state: MotionState) -> Self {
        Self {
            beats_per_minute: estimate.frequency * 60.0,
            state,
            energy: estimate.energy,
        }
    }
}
