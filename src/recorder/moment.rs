use std::{cmp::Ordering, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::position::TickPosition;

/// A recorded musical position: the clock's measure and beat, plus how far
/// into that beat (in beats) the event happened.
///
/// `fraction` is normally in `[0, 1)`, but can exceed 1 when an event lands
/// more than a beat after the last clock tick.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub measure: u64,
    pub beat: u32,
    pub fraction: f64,
}

impl Moment {
    pub const ZERO: Moment = Moment {
        measure: 0,
        beat: 0,
        fraction: 0.0,
    };

    pub fn new(measure: u64, beat: u32, fraction: f64) -> Self {
        // also maps NaN and -0.0 onto 0.0
        let fraction = if fraction > 0.0 && fraction.is_finite() {
            fraction
        } else {
            0.0
        };
        Self {
            measure,
            beat,
            fraction,
        }
    }

    /// The moment `fraction` beats after a clock tick.
    pub fn at(position: &TickPosition, fraction: f64) -> Self {
        Self::new(position.measure(), position.beat(), fraction)
    }

    /// Convert a beat count into a moment, optionally snapping the fractional
    /// part to a grid of `quantize` steps per beat.
    pub fn from_beats(beats: f64, beats_per_measure: u32, quantize: Option<u32>) -> Self {
        let mut beats = if beats > 0.0 && beats.is_finite() { beats } else { 0.0 };
        if let Some(steps) = quantize.filter(|s| *s > 0) {
            let whole = beats.floor();
            let steps = steps as f64;
            beats = whole + ((beats - whole) * steps).floor() / steps;
        }

        let per_measure = beats_per_measure.max(1) as f64;
        let measure = (beats / per_measure).floor();
        let rest = beats - measure * per_measure;
        let beat = rest.floor();
        Self::new(measure as u64, beat as u32, rest - beat)
    }

    /// Total beats since the start of the recording.
    pub fn to_beats(&self, beats_per_measure: u32) -> f64 {
        self.measure as f64 * beats_per_measure as f64 + self.beat as f64 + self.fraction
    }

    /// The same position moved by `beats` (negative moves earlier, never before zero).
    pub fn offset(&self, beats: f64, beats_per_measure: u32) -> Self {
        Self::from_beats(
            self.to_beats(beats_per_measure) + beats,
            beats_per_measure,
            None,
        )
    }

    /// True once the clock has reached this moment's measure and beat.
    pub fn is_due(&self, position: &TickPosition) -> bool {
        (self.measure, self.beat) <= position.measure_beat()
    }
}

impl PartialEq for Moment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Moment {}

impl PartialOrd for Moment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Moment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.measure
            .cmp(&other.measure)
            .then(self.beat.cmp(&other.beat))
            .then(self.fraction.total_cmp(&other.fraction))
    }
}

impl Default for Moment {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}+{:.3}",
            self.measure + 1,
            self.beat + 1,
            self.fraction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_measure_beat_fraction() {
        let a = Moment::new(0, 3, 0.9);
        let b = Moment::new(1, 0, 0.0);
        let c = Moment::new(1, 0, 0.25);
        assert!(a < b && b < c);
        assert_eq!(Moment::new(2, 1, 0.5), Moment::new(2, 1, 0.5));
    }

    #[test]
    fn beats_round_trip_through_measures() {
        let moment = Moment::from_beats(9.5, 4, None);
        assert_eq!((moment.measure, moment.beat), (2, 1));
        assert!((moment.fraction - 0.5).abs() < 1e-9);
        assert_eq!(moment.to_beats(4), 9.5);
    }

    #[test]
    fn quantize_snaps_down_to_grid() {
        let moment = Moment::from_beats(1.37, 4, Some(4));
        assert_eq!(moment.beat, 1);
        assert!((moment.fraction - 0.25).abs() < 1e-9);
    }

    #[test]
    fn negative_and_invalid_input_clamps_to_zero() {
        assert_eq!(Moment::from_beats(-3.0, 4, None), Moment::ZERO);
        assert_eq!(Moment::from_beats(f64::NAN, 4, None), Moment::ZERO);
        assert_eq!(Moment::new(0, 0, -0.5), Moment::ZERO);
    }

    #[test]
    fn offset_carries_into_next_measure() {
        let moment = Moment::new(0, 3, 0.5).offset(1.0, 4);
        assert_eq!((moment.measure, moment.beat), (1, 0));
        assert!((moment.fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn due_compares_measure_and_beat_only() {
        let moment = Moment::new(1, 2, 0.75);
        assert!(moment.is_due(&TickPosition::new(1, 2)));
        assert!(moment.is_due(&TickPosition::new(2, 0)));
        assert!(!moment.is_due(&TickPosition::new(1, 1)));
    }
}
