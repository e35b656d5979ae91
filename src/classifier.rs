//! Motion-state classification and edge detection
//!
//! Bands are tested in a fixed order and the first match wins. They are not
//! disjoint: high energy satisfies both the sprint band and the running
//! energy floor, and low-energy readings at walking cadence also fall under
//! the standing ceiling. The order resolves those overlaps.

use crate::config::BandThresholds;
use crate::types::MotionState;
use tracing::info;

type BandPredicate = fn(&BandThresholds, f64, f64) -> bool;

/// Ordered `(label, predicate)` pairs, evaluated first-match-wins
const BANDS: [(MotionState, BandPredicate); 4] = [
    (MotionState::Sprinting, sprinting),
    (MotionState::Running, running),
    (MotionState::Walking, walking),
    (MotionState::Standing, standing),
];

fn sprinting(t: &BandThresholds, _frequency: f64, energy: f64) -> bool {
    energy > t.sprint_energy_min
}

fn running(t: &BandThresholds, frequency: f64, energy: f64) -> bool {
    t.run_frequency.contains(frequency) && energy >= t.run_energy_min
}

fn walking(t: &BandThresholds, frequency: f64, energy: f64) -> bool {
    t.walk_frequency.contains(frequency) && t.walk_energy.contains(energy)
}

fn standing(t: &BandThresholds, _frequency: f64, energy: f64) -> bool {
    energy < t.standing_energy_max
}

/// Map smoothed frequency and energy onto a motion state.
///
/// Pure: the result depends only on the inputs and the thresholds.
pub fn classify(thresholds: &BandThresholds, frequency: f64, energy: f64) -> MotionState {
    BANDS
        .iter()
        .find(|(_, predicate)| predicate(thresholds, frequency, energy))
        .map(|(state, _)| *state)
        .unwrap_or(MotionState::Unknown)
}

/// Classifier with edge detection over successive states
#[derive(Debug, Clone)]
pub struct Classifier {
    thresholds: BandThresholds,
    last_state: MotionState,
}

impl Classifier {
    pub fn new(thresholds: BandThresholds) -> Self {
        Self {
            thresholds,
            last_state: MotionState::Unknown,
        }
    }

    pub fn thresholds(&self) -> &BandThresholds {
        &self.thresholds
    }

    pub fn last_state(&self) -> MotionState {
        self.last_state
    }

    pub fn classify(&self, frequency: f64, energy: f64) -> MotionState {
        classify(&self.thresholds, frequency, energy)
    }

    /// Report whether `new_state` is a visible transition.
    ///
    /// Fires only for a known state that differs from the previous one. The
    /// previous state is always overwritten, including with `Unknown`, so a
    /// state seen again after an `Unknown` dip fires again.
    pub fn detect_edge(&mut self, new_state: MotionState) -> bool {
        let previous = std::mem::replace(&mut self.last_state, new_state);
        let fired = new_state != MotionState::Unknown && new_state != previous;
        if fired {
            info!(from = %previous, to = %new_state, "motion state changed");
        }
        fired
    }

    pub fn reset(&mut self) {
        self.last_state = MotionState::Unknown;
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(BandThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Range;
    use pretty_assertions::assert_eq;

    fn default_classify(frequency: f64, energy: f64) -> MotionState {
        classify(&BandThresholds::default(), frequency, energy)
    }

    #[test]
    fn test_each_band() {
        assert_eq!(default_classify(1.0, 900.0), MotionState::Sprinting);
        assert_eq!(default_classify(1.5, 600.0), MotionState::Running);
        assert_eq!(default_classify(0.8, 250.0), MotionState::Walking);
        assert_eq!(default_classify(0.0, 10.0), MotionState::Standing);
        assert_eq!(default_classify(1.5, 280.0), MotionState::Unknown);
    }

    #[test]
    fn test_band_edges() {
        // Sprint threshold is exclusive
        assert_eq!(default_classify(1.5, 800.0), MotionState::Running);
        // Running frequency upper bound is exclusive
        assert_eq!(default_classify(2.0, 550.0), MotionState::Unknown);
        assert_eq!(default_classify(1.3, 500.0), MotionState::Running);
        // Walking energy upper bound is exclusive
        assert_eq!(default_classify(1.0, 500.0), MotionState::Unknown);
        assert_eq!(default_classify(0.3, 100.0), MotionState::Walking);
        // Standing ceiling is exclusive
        assert_eq!(default_classify(0.1, 100.0), MotionState::Unknown);
    }

    #[test]
    fn test_order_resolves_overlap() {
        // Running cadence with sprint-level energy: sprint is tested first
        assert_eq!(default_classify(1.5, 1200.0), MotionState::Sprinting);

        // Overlapping walk and standing bands: walk is tested first
        let thresholds = BandThresholds {
            walk_energy: Range::new(50.0, 500.0),
            ..Default::default()
        };
        assert_eq!(classify(&thresholds, 1.0, 60.0), MotionState::Walking);
        assert_eq!(classify(&thresholds, 2.5, 60.0), MotionState::Standing);
    }

    #[test]
    fn test_non_finite_input_is_unknown() {
        assert_eq!(default_classify(f64::NAN, f64::NAN), MotionState::Unknown);
        assert_eq!(default_classify(1.0, f64::NAN), MotionState::Unknown);
    }

    #[test]
    fn test_negative_energy_is_standing() {
        assert_eq!(default_classify(0.5, -40.0), MotionState::Standing);
    }

    #[test]
    fn test_classify_ignores_history() {
        let mut classifier = Classifier::default();
        let first = classifier.classify(1.5, 600.0);
        classifier.detect_edge(MotionState::Sprinting);
        classifier.detect_edge(MotionState::Walking);
        assert_eq!(classifier.classify(1.5, 600.0), first);
    }

    #[test]
    fn test_edge_fires_once_per_state() {
        let mut classifier = Classifier::default();
        assert!(classifier.detect_edge(MotionState::Walking));
        assert!(!classifier.detect_edge(MotionState::Walking));
        assert!(!classifier.detect_edge(MotionState::Walking));
        assert!(classifier.detect_edge(MotionState::Running));
        assert_eq!(classifier.last_state(), MotionState::Running);
    }

    #[test]
    fn test_unknown_never_fires_but_overwrites() {
        let mut classifier = Classifier::default();
        assert!(!classifier.detect_edge(MotionState::Unknown));

        assert!(classifier.detect_edge(MotionState::Standing));
        assert!(!classifier.detect_edge(MotionState::Unknown));
        assert_eq!(classifier.last_state(), MotionState::Unknown);

        // Same state after the dip is announced again
        assert!(classifier.detect_edge(MotionState::Standing));
    }

    #[test]
    fn test_reset_restores_unknown() {
        let mut classifier = Classifier::default();
        classifier.detect_edge(MotionState::Running);
        classifier.reset();
        assert_eq!(classifier.last_state(), MotionState::Unknown);
        assert!(classifier.detect_edge(MotionState::Running));
    }
}
