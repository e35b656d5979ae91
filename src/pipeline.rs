//! Pipeline orchestration
//!
//! This module provides the public API for gait-flux. A sample flows through
//! the stages in a fixed order: estimate → classify → detect edge → command.

use crate::classifier::Classifier;
use crate::config::GaitConfig;
use crate::error::GaitError;
use crate::estimator::{Estimator, EstimatorState};
use crate::types::{Command, Estimate, MotionState, Sample};
use crate::wire::{self, InboundMessage};
use tracing::{info, warn};

/// Run a batch of samples through a fresh processor.
///
/// Rejected samples are logged and skipped.
///
/// # Returns
/// The commands emitted, in order
///
/// # Example
/// ```ignore
/// let commands = replay_samples(&samples, GaitConfig::default())?;
/// ```
pub fn replay_samples(samples: &[Sample], config: GaitConfig) -> Result<Vec<Command>, GaitError> {
    let mut processor = GaitProcessor::with_config(config)?;
    let mut commands = Vec::new();

    for sample in samples {
        match processor.ingest_sample(sample) {
            Ok(Some(command)) => commands.push(command),
            Ok(None) => {}
            Err(e @ GaitError::NonIncreasingTimestamp { .. }) => {
                warn!(error = %e, "sample skipped");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(commands)
}

/// Stateful filter for one sensor stream.
///
/// Construct one per stream; independent streams never share state.
#[derive(Debug, Clone)]
pub struct GaitProcessor {
    config: GaitConfig,
    estimator: Estimator,
    classifier: Classifier,
}

impl Default for GaitProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl GaitProcessor {
    /// Create a processor with the default configuration
    pub fn new() -> Self {
        let config = GaitConfig::default();
        Self {
            estimator: Estimator::new(&config),
            classifier: Classifier::new(config.bands),
            config,
        }
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: GaitConfig) -> Result<Self, GaitError> {
        config.validate()?;
        Ok(Self {
            estimator: Estimator::new(&config),
            classifier: Classifier::new(config.bands),
            config,
        })
    }

    /// Create a processor whose first sample is timed against `origin`
    pub fn with_origin(config: GaitConfig, origin: f64) -> Result<Self, GaitError> {
        let mut processor = Self::with_config(config)?;
        processor.estimator = Estimator::with_origin(&processor.config, origin);
        Ok(processor)
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    pub fn estimator_state(&self) -> &EstimatorState {
        self.estimator.state()
    }

    /// Current smoothed averages, if any sample has been accepted
    pub fn estimate(&self) -> Option<Estimate> {
        self.estimator.estimate()
    }

    /// State reported by the most recent evaluation
    pub fn last_state(&self) -> MotionState {
        self.classifier.last_state()
    }

    /// Feed one sample through the filter.
    ///
    /// # Returns
    /// `Some(command)` when the motion state changed to a known state,
    /// `None` otherwise, including for the sample that primes the stream.
    /// A rejected sample leaves all state unchanged.
    pub fn ingest_sample(&mut self, sample: &Sample) -> Result<Option<Command>, GaitError> {
        // Stage 1: Update the running averages
        let Some(estimate) = self.estimator.ingest(sample)? else {
            return Ok(None);
        };

        // Stage 2: Classify the averages
        let state = self.classifier.classify(estimate.frequency, estimate.energy);

        // Stage 3: Only announce transitions
        if self.classifier.detect_edge(state) {
            Ok(Some(Command::from_estimate(estimate, state)))
        } else {
            Ok(None)
        }
    }

    /// Decode a transport message and feed it through the filter.
    ///
    /// # Returns
    /// Encoded command JSON when the motion state changed
    pub fn process_message(&mut self, json: &str) -> Result<Option<String>, GaitError> {
        match wire::parse_message(json)? {
            InboundMessage::Gait(sample) => match self.ingest_sample(&sample)? {
                Some(command) => Ok(Some(wire::encode_command(&command)?)),
                None => Ok(None),
            },
            InboundMessage::Gesture(gesture) => {
                info!(gesture = ?gesture.gesture, timestamp = ?gesture.timestamp, "gesture received");
                Ok(None)
            }
        }
    }

    /// Clear estimator history and the last reported state
    pub fn reset(&mut self) {
        self.estimator = Estimator::new(&self.config);
        self.classifier.reset();
    }
}
