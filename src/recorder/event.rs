use std::{fmt, time::Duration};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::intervals::Intervals;

use super::moment::Moment;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub(crate) u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recorded note. `stop` is `None` while the key is still down.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub id: EventId,
    pub pitch: u8,
    pub velocity: u8,
    pub start: Moment,
    pub stop: Option<Moment>,
}

impl NoteEvent {
    /// Length in beats; an unfinished note counts as one beat.
    pub fn length_beats(&self, beats_per_measure: u32) -> f64 {
        match self.stop {
            Some(stop) => {
                (stop.to_beats(beats_per_measure) - self.start.to_beats(beats_per_measure))
                    .max(0.0)
            }
            None => 1.0,
        }
    }

    /// Where the note ends, using the one-beat default for unfinished notes.
    pub fn end(&self, beats_per_measure: u32) -> Moment {
        self.stop
            .unwrap_or_else(|| self.start.offset(1.0, beats_per_measure))
    }

    /// Wall-clock timing for playback, relative to the tick at the note's beat.
    pub fn schedule(&self, intervals: &Intervals) -> ScheduledNote {
        let beat = intervals.beat_duration();
        ScheduledNote {
            pitch: self.pitch,
            velocity: self.velocity,
            delay: beat.mul_f64(self.start.fraction),
            length: beat.mul_f64(self.length_beats(intervals.beats_per_measure())),
        }
    }
}

/// A note due for playback: start `delay` after the current tick and hold
/// for `length`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub velocity: u8,
    pub delay: Duration,
    pub length: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: Moment, stop: Option<Moment>) -> NoteEvent {
        NoteEvent {
            id: EventId(1),
            pitch: 60,
            velocity: 100,
            start,
            stop,
        }
    }

    #[test]
    fn schedule_uses_fraction_and_length() {
        // 120 bpm: 500 ms beats
        let intervals = Intervals::new(120.0, 4, 4).unwrap();
        let note = event(Moment::new(0, 1, 0.5), Some(Moment::new(0, 3, 0.0)));
        let scheduled = note.schedule(&intervals);

        assert_eq!(scheduled.delay, Duration::from_millis(250));
        assert_eq!(scheduled.length, Duration::from_millis(750));
    }

    #[test]
    fn unfinished_note_lasts_one_beat() {
        let intervals = Intervals::new(120.0, 4, 4).unwrap();
        let note = event(Moment::new(0, 3, 0.0), None);
        assert_eq!(note.schedule(&intervals).length, Duration::from_millis(500));
        assert_eq!(note.end(4), Moment::new(1, 0, 0.0));
    }
}
