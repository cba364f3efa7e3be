use std::time::Instant;

use super::{intervals::Intervals, position::TickPosition};

/// Requests to a running clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockCommand {
    /// Replace the tempo and meter. Stops the clock; send `Start` to resume.
    SetTempo {
        bpm: f64,
        divisions: usize,
        beats_per_measure: u32,
    },
    Start,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMessage {
    /// Reply to an accepted `SetTempo`
    Intervals(Intervals),
    /// The measure or beat changed
    Tick {
        position: TickPosition,
        timestamp: Instant,
    },
}
