#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time signature of the practice session
///
/// The clock counts in quarter-note beats, so a signature is only usable
/// when its measure is a whole number of quarters (4/4, 3/4, 6/8, 2/2).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    /// Number of notes per bar (numerator)
    pub numerator: u8,
    /// Note value of the numerator (4 = quarter, 8 = eighth)
    pub denominator: u8,
}

impl TimeSignature {
    /// Standard 4/4 time
    pub const FOUR_FOUR: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    /// 3/4 time (waltz)
    pub const THREE_FOUR: TimeSignature = TimeSignature {
        numerator: 3,
        denominator: 4,
    };

    /// 6/8 time, counted as three quarter beats
    pub const SIX_EIGHT: TimeSignature = TimeSignature {
        numerator: 6,
        denominator: 8,
    };

    /// 2/2 time (cut time), counted as four quarter beats
    pub const TWO_TWO: TimeSignature = TimeSignature {
        numerator: 2,
        denominator: 2,
    };

    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Quarter-note beats per bar, if the bar holds a whole number of them.
    pub fn beats_per_measure(&self) -> Option<u32> {
        if self.numerator == 0 || !matches!(self.denominator, 1 | 2 | 4 | 8 | 16 | 32) {
            return None;
        }
        let quarters_x4 = self.numerator as u32 * 4;
        let denominator = self.denominator as u32;
        (quarters_x4 % denominator == 0).then(|| quarters_x4 / denominator)
    }

    /// Denominator as a power of two, the way a MIDI time signature stores it.
    pub fn denominator_log2(&self) -> u8 {
        self.denominator.max(1).trailing_zeros() as u8
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FOUR_FOUR
    }
}
