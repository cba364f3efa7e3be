use std::fmt;

use super::intervals::MAX_DIVISIONS;

const SUBDIVISION_SLOTS: usize = MAX_DIVISIONS - 1;

/// Where the clock is: measure, beat within the measure, and for every
/// tracked subdivision the index of that subdivision within the beat.
///
/// Positions compare lexicographically, so a later moment always compares
/// greater at a fixed tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickPosition {
    measure: u64,
    beat: u32,
    subdivisions: [u32; SUBDIVISION_SLOTS],
    len: u8,
}

impl TickPosition {
    pub const ZERO: TickPosition = TickPosition {
        measure: 0,
        beat: 0,
        subdivisions: [0; SUBDIVISION_SLOTS],
        len: 0,
    };

    pub fn new(measure: u64, beat: u32) -> Self {
        Self {
            measure,
            beat,
            ..Self::ZERO
        }
    }

    /// Attach subdivision indices, starting with the `2`-division (eighths).
    pub fn with_subdivisions(mut self, subdivisions: &[u32]) -> Self {
        let len = subdivisions.len().min(SUBDIVISION_SLOTS);
        self.subdivisions = [0; SUBDIVISION_SLOTS];
        self.subdivisions[..len].copy_from_slice(&subdivisions[..len]);
        self.len = len as u8;
        self
    }

    pub fn measure(&self) -> u64 {
        self.measure
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    /// Index of the current `division`-th of the beat (`division >= 2`).
    pub fn subdivision(&self, division: usize) -> Option<u32> {
        division
            .checked_sub(2)
            .filter(|slot| *slot < self.len as usize)
            .map(|slot| self.subdivisions[slot])
    }

    pub fn subdivisions(&self) -> &[u32] {
        &self.subdivisions[..self.len as usize]
    }

    /// The `(measure, beat)` pair the clock reports changes on.
    pub fn measure_beat(&self) -> (u64, u32) {
        (self.measure, self.beat)
    }
}

impl Default for TickPosition {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for TickPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.measure + 1, self.beat + 1)
    }
}
