use std::time::Duration;

/// Highest subdivision of a beat the clock can track (32 = 128th notes in 4/4).
pub const MAX_DIVISIONS: usize = 32;

/// Interval lengths, in milliseconds, for every musical level the clock tracks.
///
/// Index 0 is the measure, index 1 the beat (a quarter note), and index `i >= 2`
/// is the beat divided by `i`: 2 = eighths, 3 = eighth triplets, 4 = sixteenths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intervals {
    bpm: f64,
    divisions: usize,
    beats_per_measure: u32,
    values: [f64; MAX_DIVISIONS + 1],
}

impl Intervals {
    pub fn new(bpm: f64, divisions: usize, beats_per_measure: u32) -> Result<Self, ClockError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ClockError::InvalidTempo(bpm));
        }
        if divisions == 0 || divisions > MAX_DIVISIONS {
            return Err(ClockError::InvalidDivisions(divisions));
        }
        if beats_per_measure == 0 {
            return Err(ClockError::InvalidMeter(beats_per_measure));
        }

        let beat = 60_000.0 / bpm;
        let mut values = [0.0; MAX_DIVISIONS + 1];
        values[0] = beat * beats_per_measure as f64;
        values[1] = beat;
        for (i, value) in values.iter_mut().enumerate().take(divisions + 1).skip(2) {
            *value = beat / i as f64;
        }

        Ok(Self {
            bpm,
            divisions,
            beats_per_measure,
            values,
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    /// Measure length in milliseconds.
    pub fn measure(&self) -> f64 {
        self.values[0]
    }

    /// Beat length in milliseconds.
    pub fn beat(&self) -> f64 {
        self.values[1]
    }

    /// Length of one `division`-th of a beat, for `2..=divisions`.
    pub fn division(&self, division: usize) -> Option<f64> {
        (2..=self.divisions)
            .contains(&division)
            .then(|| self.values[division])
    }

    /// All tracked levels: measure, beat, then each subdivision.
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..=self.divisions]
    }

    pub fn beat_duration(&self) -> Duration {
        Duration::from_secs_f64(self.beat() / 1000.0)
    }

    pub fn measure_duration(&self) -> Duration {
        Duration::from_secs_f64(self.measure() / 1000.0)
    }
}

/// Errors from tempo and meter input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockError {
    /// Tempo is not a positive, finite number of beats per minute
    InvalidTempo(f64),
    /// Subdivision count outside `1..=MAX_DIVISIONS`
    InvalidDivisions(usize),
    /// A measure needs at least one beat
    InvalidMeter(u32),
}

impl std::fmt::Display for ClockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockError::InvalidTempo(bpm) => write!(f, "invalid tempo: {} bpm", bpm),
            ClockError::InvalidDivisions(divisions) => write!(
                f,
                "invalid divisions: {} (expected 1 to {})",
                divisions, MAX_DIVISIONS
            ),
            ClockError::InvalidMeter(beats) => {
                write!(f, "invalid meter: {} beats per measure", beats)
            }
        }
    }
}

impl std::error::Error for ClockError {}
