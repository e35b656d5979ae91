//! Frequency and energy estimation
//!
//! Turns raw samples into smoothed running averages. Each accepted sample
//! yields an instantaneous frequency (inverse of the elapsed time since the
//! previous sample) and energy (peak minus trough). Both are folded into a
//! bias-weighted average whose history count is capped, so old motion is
//! forgotten after at most `max_history_window` samples.

use crate::config::GaitConfig;
use crate::error::GaitError;
use crate::types::{Estimate, Sample};
use tracing::debug;

/// Mutable per-stream estimator state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimatorState {
    /// Smoothed frequency (Hz), unset until the first sample
    pub average_frequency: Option<f64>,
    /// Smoothed energy, unset until the first sample
    pub average_energy: Option<f64>,
    /// Timestamp of the last accepted sample (seconds)
    pub last_timestamp: Option<f64>,
    /// Number of samples backing the averages, capped at the window size
    pub history_count: usize,
}

/// Bias-weighted estimator for one sensor stream
#[derive(Debug, Clone)]
pub struct Estimator {
    state: EstimatorState,
    max_history_window: usize,
    max_frequency: f64,
}

impl Estimator {
    pub fn new(config: &GaitConfig) -> Self {
        Self {
            state: EstimatorState::default(),
            max_history_window: config.max_history_window,
            max_frequency: config.max_frequency,
        }
    }

    /// Create an estimator whose first sample is timed against `origin`
    pub fn with_origin(config: &GaitConfig, origin: f64) -> Self {
        let mut estimator = Self::new(config);
        estimator.state.last_timestamp = Some(origin);
        estimator
    }

    pub fn state(&self) -> &EstimatorState {
        &self.state
    }

    /// Current averages, if any sample has been accepted
    pub fn estimate(&self) -> Option<Estimate> {
        match (self.state.average_frequency, self.state.average_energy) {
            (Some(frequency), Some(energy)) => Some(Estimate { frequency, energy }),
            _ => None,
        }
    }

    /// Fold a sample into the running averages.
    ///
    /// The first sample of a stream without an origin has no interval to
    /// measure: it only records the timestamp and yields `None`. The sample
    /// after it seeds the averages. A sample whose timestamp does not
    /// strictly follow the previous one is rejected and the state is left
    /// untouched.
    pub fn ingest(&mut self, sample: &Sample) -> Result<Option<Estimate>, GaitError> {
        let Some(previous) = self.state.last_timestamp else {
            if !sample.timestamp.is_finite() {
                return Err(GaitError::NonIncreasingTimestamp {
                    previous: f64::NEG_INFINITY,
                    current: sample.timestamp,
                });
            }
            self.state.last_timestamp = Some(sample.timestamp);
            debug!(timestamp = sample.timestamp, "stream primed");
            return Ok(None);
        };

        let instant_frequency = instant_frequency(previous, sample.timestamp)?;
        let instant_energy = sample.energy();

        let (frequency, energy) = match (self.state.average_frequency, self.state.average_energy)
        {
            (Some(frequency), Some(energy)) => {
                let count = self.state.history_count as f64;
                let blended = (
                    biased_average(frequency, instant_frequency, count),
                    biased_average(energy, instant_energy, count),
                );
                self.state.history_count =
                    (self.state.history_count + 1).min(self.max_history_window);
                blended
            }
            _ => (instant_frequency, instant_energy),
        };

        let frequency = frequency.min(self.max_frequency);

        self.state.average_frequency = Some(frequency);
        self.state.average_energy = Some(energy);
        self.state.last_timestamp = Some(sample.timestamp);

        debug!(
            timestamp = sample.timestamp,
            instant_frequency,
            instant_energy,
            frequency,
            energy,
            history = self.state.history_count,
            "sample ingested"
        );

        Ok(Some(Estimate { frequency, energy }))
    }

    /// Forget all history, keeping the configuration
    pub fn reset(&mut self) {
        self.state = EstimatorState::default();
    }
}

fn instant_frequency(previous: f64, timestamp: f64) -> Result<f64, GaitError> {
    let elapsed = timestamp - previous;
    // Also catches NaN and infinite timestamps
    if !(elapsed.is_finite() && elapsed > 0.0) {
        return Err(GaitError::NonIncreasingTimestamp {
            previous,
            current: timestamp,
        });
    }

    Ok(1.0 / elapsed)
}

fn biased_average(average: f64, instant: f64, count: f64) -> f64 {
    (average * count + instant) / (count + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FREQUENCY;
    use pretty_assertions::assert_eq;

    fn estimator(window: usize) -> Estimator {
        Estimator::new(&GaitConfig::default().with_max_history_window(window))
    }

    /// Estimator that has already seen its priming sample at t=0
    fn primed(window: usize) -> Estimator {
        let mut est = estimator(window);
        assert_eq!(est.ingest(&Sample::new(0.0, 0.0, 0.0)).unwrap(), None);
        est
    }

    #[test]
    fn test_first_sample_only_primes() {
        let mut est = estimator(1);
        let estimate = est.ingest(&Sample::new(0.0, 1000.0, 0.0)).unwrap();

        assert_eq!(estimate, None);
        assert!(est.estimate().is_none());
        assert_eq!(est.state().average_frequency, None);
        assert_eq!(est.state().average_energy, None);
        assert_eq!(est.state().history_count, 0);
        assert_eq!(est.state().last_timestamp, Some(0.0));
    }

    #[test]
    fn test_second_sample_seeds_averages() {
        let mut est = primed(1);
        let estimate = est.ingest(&Sample::new(1.0, 10.0, 0.0)).unwrap().unwrap();

        assert_eq!(estimate.frequency, 1.0);
        assert_eq!(estimate.energy, 10.0);
        assert_eq!(est.state().history_count, 0);
        assert_eq!(est.state().last_timestamp, Some(1.0));
    }

    #[test]
    fn test_first_sample_seeds_against_origin() {
        let mut est = Estimator::with_origin(&GaitConfig::default(), 10.0);
        let estimate = est.ingest(&Sample::new(12.0, 50.0, 10.0)).unwrap().unwrap();

        assert_eq!(estimate.frequency, 0.5);
        assert_eq!(estimate.energy, 40.0);
        assert_eq!(est.state().history_count, 0);
    }

    #[test]
    fn test_sample_after_seed_replaces_it() {
        // History is still 0 after seeding, so the next sample is not blended
        let mut est = primed(1);
        est.ingest(&Sample::new(1.0, 10.0, 0.0)).unwrap();
        let estimate = est.ingest(&Sample::new(1.5, 600.0, 50.0)).unwrap().unwrap();

        assert_eq!(estimate.frequency, 2.0);
        assert_eq!(estimate.energy, 550.0);
        assert_eq!(est.state().history_count, 1);
    }

    #[test]
    fn test_window_of_one_blends_equally() {
        let mut est = primed(1);
        est.ingest(&Sample::new(1.0, 10.0, 0.0)).unwrap();
        est.ingest(&Sample::new(1.5, 600.0, 50.0)).unwrap();
        let estimate = est.ingest(&Sample::new(2.5, 50.0, 0.0)).unwrap().unwrap();

        // (2.0 + 1.0) / 2 and (550 + 50) / 2
        assert_eq!(estimate.frequency, 1.5);
        assert_eq!(estimate.energy, 300.0);
        assert_eq!(est.state().history_count, 1);
    }

    #[test]
    fn test_larger_window_accumulates_history() {
        let mut est = primed(3);
        est.ingest(&Sample::new(1.0, 0.0, 0.0)).unwrap();
        for (i, energy) in [30.0, 60.0, 90.0].iter().enumerate() {
            est.ingest(&Sample::new((i + 2) as f64, *energy, 0.0)).unwrap();
        }
        // 30, then (30 + 60) / 2 = 45, then (45 * 2 + 90) / 3 = 60
        assert_eq!(est.estimate().unwrap().energy, 60.0);
        assert_eq!(est.state().history_count, 3);

        est.ingest(&Sample::new(5.0, 120.0, 0.0)).unwrap();
        // Capped at 3: (60 * 3 + 120) / 4 = 75
        assert_eq!(est.estimate().unwrap().energy, 75.0);
        assert_eq!(est.state().history_count, 3);
    }

    #[test]
    fn test_history_and_frequency_stay_capped() {
        let config = GaitConfig::default()
            .with_max_history_window(4)
            .with_max_frequency(4.0);
        let mut est = Estimator::new(&config);

        let mut t = 0.0;
        let mut last_count = 0;
        for i in 0..200 {
            // Alternate very short and long gaps
            t += if i % 2 == 0 { 0.001 } else { 2.0 };
            if let Some(estimate) = est.ingest(&Sample::new(t, 300.0, 0.0)).unwrap() {
                assert!(estimate.frequency <= 4.0);
            }

            assert!(est.state().history_count <= 4);
            assert!(est.state().history_count >= last_count);
            last_count = est.state().history_count;
        }
    }

    #[test]
    fn test_seed_is_clamped_to_max_frequency() {
        let mut est = Estimator::with_origin(&GaitConfig::default(), 0.0);
        let estimate = est.ingest(&Sample::new(0.01, 10.0, 0.0)).unwrap().unwrap();
        assert_eq!(estimate.frequency, DEFAULT_MAX_FREQUENCY);
    }

    #[test]
    fn test_non_increasing_timestamp_rejected_without_side_effects() {
        let mut est = primed(1);
        est.ingest(&Sample::new(1.0, 10.0, 0.0)).unwrap();
        let before = est.state().clone();

        let same = est.ingest(&Sample::new(1.0, 900.0, 0.0));
        assert!(matches!(
            same,
            Err(GaitError::NonIncreasingTimestamp {
                previous,
                current
            }) if previous == 1.0 && current == 1.0
        ));

        let earlier = est.ingest(&Sample::new(0.5, 900.0, 0.0));
        assert!(earlier.is_err());

        assert_eq!(est.state(), &before);
    }

    #[test]
    fn test_repeated_priming_timestamp_rejected() {
        let mut est = primed(1);
        assert!(est.ingest(&Sample::new(0.0, 10.0, 0.0)).is_err());
        assert!(est.estimate().is_none());
    }

    #[test]
    fn test_non_finite_timestamp_rejected() {
        let mut est = estimator(1);
        assert!(est.ingest(&Sample::new(f64::NAN, 10.0, 0.0)).is_err());
        assert_eq!(est.state(), &EstimatorState::default());

        est.ingest(&Sample::new(0.0, 10.0, 0.0)).unwrap();
        assert!(est.ingest(&Sample::new(f64::INFINITY, 10.0, 0.0)).is_err());
        assert_eq!(est.state().last_timestamp, Some(0.0));
    }

    #[test]
    fn test_negative_energy_propagates() {
        let mut est = primed(1);
        let estimate = est.ingest(&Sample::new(1.0, 0.0, 40.0)).unwrap().unwrap();
        assert_eq!(estimate.energy, -40.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut est = primed(2);
        est.ingest(&Sample::new(1.0, 10.0, 0.0)).unwrap();
        est.reset();

        assert_eq!(est.state(), &EstimatorState::default());
        assert!(est.estimate().is_none());

        // The stream primes again after a reset
        assert_eq!(est.ingest(&Sample::new(5.0, 10.0, 0.0)).unwrap(), None);
    }
}
