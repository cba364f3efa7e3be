use std::time::Duration;

use crate::synth::message::SynthMessage;

use super::{intervals::Intervals, position::TickPosition};

const ACCENT_NOTE: u8 = 84;
const BEAT_NOTE: u8 = 67;
const SUBDIVISION_NOTE: u8 = 72;
const CLICK_VELOCITY: u8 = 64;

/// Every click starts slightly in the future so it never lands mid-block.
const LEAD_TIME: Duration = Duration::from_millis(10);

/// One metronome beep, due `delay` after the tick that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub note: u8,
    pub velocity: u8,
    pub delay: Duration,
    pub duration: Duration,
}

impl Click {
    pub fn message(&self) -> SynthMessage {
        SynthMessage::Play {
            note: self.note,
            velocity: self.velocity,
            duration: self.duration,
        }
    }
}

/// Turns clock ticks into click notes.
///
/// A new measure gets a high accent, any other beat a lower click. On top of
/// that the beat is split into `active_division` evenly spaced subdivision
/// clicks, the first of which lands on the beat itself.
#[derive(Debug, Clone)]
pub struct Metronome {
    beep: Duration,
    active_division: usize,
    muted: bool,
    previous: Option<(u64, u32)>,
}

impl Metronome {
    pub fn new(beep: Duration, active_division: usize) -> Self {
        Self {
            beep,
            active_division,
            muted: false,
            previous: None,
        }
    }

    pub fn on_tick(&mut self, position: &TickPosition, intervals: &Intervals) -> Vec<Click> {
        let (measure, beat) = position.measure_beat();
        let previous = self.previous.replace((measure, beat));
        if self.muted {
            return Vec::new();
        }

        let new_measure = previous.map_or(true, |(m, _)| m != measure);
        let new_beat = previous.map_or(true, |(_, b)| b != beat);

        let mut clicks = Vec::with_capacity(self.active_division + 1);
        if new_measure {
            clicks.push(self.click(ACCENT_NOTE, Duration::ZERO));
        } else if new_beat {
            clicks.push(self.click(BEAT_NOTE, Duration::ZERO));
        }

        let beat_length = intervals.beat_duration();
        let division = self.active_division as u32;
        for i in 0..division {
            clicks.push(self.click(SUBDIVISION_NOTE, beat_length * i / division));
        }

        clicks
    }

    fn click(&self, note: u8, offset: Duration) -> Click {
        Click {
            note,
            velocity: CLICK_VELOCITY,
            delay: LEAD_TIME + offset,
            duration: self.beep,
        }
    }

    pub fn set_active_division(&mut self, division: usize) {
        self.active_division = division;
    }

    pub fn active_division(&self) -> usize {
        self.active_division
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn toggle_muted(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Forget the last tick, so the next one counts as a new measure.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals() -> Intervals {
        Intervals::new(120.0, 4, 4).unwrap()
    }

    #[test]
    fn first_tick_is_accented() {
        let mut metronome = Metronome::new(Duration::from_millis(50), 0);
        let clicks = metronome.on_tick(&TickPosition::new(0, 0), &intervals());
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].note, ACCENT_NOTE);
        assert_eq!(clicks[0].delay, LEAD_TIME);
        assert_eq!(
            clicks[0].message(),
            SynthMessage::Play {
                note: ACCENT_NOTE,
                velocity: CLICK_VELOCITY,
                duration: Duration::from_millis(50),
            }
        );
    }

    #[test]
    fn beats_within_measure_use_beat_click() {
        let mut metronome = Metronome::new(Duration::from_millis(50), 0);
        metronome.on_tick(&TickPosition::new(0, 0), &intervals());
        let clicks = metronome.on_tick(&TickPosition::new(0, 1), &intervals());
        assert_eq!(clicks[0].note, BEAT_NOTE);

        let clicks = metronome.on_tick(&TickPosition::new(1, 0), &intervals());
        assert_eq!(clicks[0].note, ACCENT_NOTE);
    }

    #[test]
    fn subdivisions_are_spread_across_the_beat() {
        let mut metronome = Metronome::new(Duration::from_millis(50), 2);
        let clicks = metronome.on_tick(&TickPosition::new(0, 0), &intervals());

        let delays: Vec<_> = clicks
            .iter()
            .filter(|c| c.note == SUBDIVISION_NOTE)
            .map(|c| c.delay)
            .collect();
        assert_eq!(
            delays,
            vec![LEAD_TIME, LEAD_TIME + Duration::from_millis(250)]
        );
    }

    #[test]
    fn muted_metronome_stays_silent_but_tracks_position() {
        let mut metronome = Metronome::new(Duration::from_millis(50), 2);
        metronome.set_muted(true);
        assert!(metronome
            .on_tick(&TickPosition::new(0, 0), &intervals())
            .is_empty());

        metronome.set_muted(false);
        let clicks = metronome.on_tick(&TickPosition::new(0, 1), &intervals());
        assert_eq!(clicks[0].note, BEAT_NOTE);
    }
}
