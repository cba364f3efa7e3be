use std::time::Instant;

use log::debug;

use crate::clock::{intervals::Intervals, position::TickPosition};

use super::{
    event::{EventId, NoteEvent, ScheduledNote},
    moment::Moment,
};

/*
Event Recorder
==============

Recording: every clock tick is remembered together with its timestamp. A
note-on stamps the event with that tick's measure and beat plus the fraction
of a beat that has passed since the tick (wall clock / beat length). A
note-off stamps the stop the same way.

    tick (1,2) @ t0          note_on @ t0 + 120 ms          (beat = 480 ms)
    ──────┬──────────────────────┬───────────────────
          │                      └─▶ Moment { 1, 2, 0.25 }

Events are kept sorted by start. Inserting places the event at its sorted
position, after any events with the same start, so equal starts keep their
recording order.

Playback: a scan cursor walks the sorted list. On every tick, all events
from the cursor whose (measure, beat) has been reached are returned as
ScheduledNotes, with the fraction turned back into a delay after the tick.
The cursor never moves backwards during a pass, so each event plays once
and in start order.
*/

/// Observer for notes captured while recording
pub trait RecorderListener {
    fn note_started(&mut self, event: &NoteEvent);
    fn note_stopped(&mut self, event: &NoteEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Errors from editing recorded events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderError {
    /// No recorded event has this id
    UnknownEvent(EventId),
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::UnknownEvent(id) => write!(f, "unknown event {}", id),
        }
    }
}

impl std::error::Error for RecorderError {}

pub struct Recorder {
    events: Vec<NoteEvent>,
    held: [Option<EventId>; 128],
    recording: bool,
    playing: bool,
    head: usize,
    last_tick: Option<(TickPosition, Instant)>,
    intervals: Intervals,
    listeners: Vec<(ListenerId, Box<dyn RecorderListener>)>,
    next_event: u64,
    next_listener: u64,
}

impl Recorder {
    pub fn new(intervals: Intervals) -> Self {
        Self {
            events: Vec::new(),
            held: [None; 128],
            recording: false,
            playing: false,
            head: 0,
            last_tick: None,
            intervals,
            listeners: Vec::new(),
            next_event: 0,
            next_listener: 0,
        }
    }

    pub fn set_intervals(&mut self, intervals: Intervals) {
        self.intervals = intervals;
    }

    pub fn intervals(&self) -> &Intervals {
        &self.intervals
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn event(&self, id: EventId) -> Option<&NoteEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Remember a clock tick. While playing, returns the notes that became due.
    pub fn tick(&mut self, position: TickPosition, timestamp: Instant) -> Vec<ScheduledNote> {
        self.last_tick = Some((position, timestamp));
        if !self.playing {
            return Vec::new();
        }

        let mut due = Vec::new();
        while let Some(event) = self.events.get(self.head) {
            if !event.start.is_due(&position) {
                break;
            }
            due.push(event.schedule(&self.intervals));
            self.head += 1;
        }
        due
    }

    /// The musical moment at `now`, measured from the last tick.
    pub fn moment_at(&self, now: Instant) -> Moment {
        match self.last_tick {
            Some((position, timestamp)) => {
                let elapsed = now.saturating_duration_since(timestamp).as_secs_f64();
                let beat = self.intervals.beat() / 1000.0;
                Moment::at(&position, elapsed / beat)
            }
            None => Moment::ZERO,
        }
    }

    pub fn start(&mut self) {
        self.recording = true;
    }

    /// Finish any held notes, then end recording and playback.
    pub fn stop(&mut self, now: Instant) -> &[NoteEvent] {
        for pitch in 0..128u8 {
            if self.held[pitch as usize].is_some() {
                self.note_off(pitch, now);
            }
        }
        self.recording = false;
        self.playing = false;
        &self.events
    }

    /// Record a key press. Ignored unless recording.
    pub fn note_on(&mut self, pitch: u8, velocity: u8, now: Instant) -> Option<EventId> {
        if !self.recording || pitch > 127 {
            return None;
        }
        if self.held[pitch as usize].is_some() {
            self.note_off(pitch, now);
        }

        let id = self.record_event(pitch, velocity, self.moment_at(now));
        self.held[pitch as usize] = Some(id);
        if let Some(event) = self.events.iter().find(|e| e.id == id) {
            for (_, listener) in self.listeners.iter_mut() {
                listener.note_started(event);
            }
        }
        Some(id)
    }

    /// Record a key release for a note started with `note_on`.
    pub fn note_off(&mut self, pitch: u8, now: Instant) -> Option<EventId> {
        let id = self.held.get_mut(pitch as usize)?.take()?;
        let stop = self.moment_at(now);
        if self.record_event_stop(id, stop).is_err() {
            debug!("held note {} was removed before release", id);
            return None;
        }

        if self.recording {
            if let Some(event) = self.events.iter().find(|e| e.id == id) {
                for (_, listener) in self.listeners.iter_mut() {
                    listener.note_stopped(event);
                }
            }
        }
        Some(id)
    }

    /// Insert an event directly (piano roll editing, file import).
    pub fn record_event(&mut self, pitch: u8, velocity: u8, start: Moment) -> EventId {
        let id = EventId(self.next_event);
        self.next_event += 1;
        self.insert(NoteEvent {
            id,
            pitch,
            velocity,
            start,
            stop: None,
        });
        id
    }

    /// Set an event's stop. A stop before the start is clamped to the start.
    pub fn record_event_stop(&mut self, id: EventId, stop: Moment) -> Result<(), RecorderError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RecorderError::UnknownEvent(id))?;
        event.stop = Some(stop.max(event.start));
        Ok(())
    }

    /// Move an event, keeping the list sorted.
    pub fn update_event(
        &mut self,
        id: EventId,
        start: Moment,
        stop: Option<Moment>,
    ) -> Result<(), RecorderError> {
        let mut event = self.remove_event(id)?;
        event.start = start;
        event.stop = stop.map(|stop| stop.max(start));
        self.insert(event);
        Ok(())
    }

    /// Change an event's pitch (dragging a note up or down the roll).
    pub fn set_pitch(&mut self, id: EventId, pitch: u8) -> Result<(), RecorderError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RecorderError::UnknownEvent(id))?;
        event.pitch = pitch.min(127);
        Ok(())
    }

    pub fn remove_event(&mut self, id: EventId) -> Result<NoteEvent, RecorderError> {
        let index = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or(RecorderError::UnknownEvent(id))?;
        if index < self.head {
            self.head -= 1;
        }
        Ok(self.events.remove(index))
    }

    /// Start a playback pass from the first event.
    pub fn playback(&mut self) {
        self.head = 0;
        self.playing = true;
    }

    /// Remove every event, returning what was recorded.
    pub fn clear(&mut self) -> Vec<NoteEvent> {
        self.head = 0;
        self.held = [None; 128];
        std::mem::take(&mut self.events)
    }

    /// Replace all events, assigning fresh ids.
    pub fn load(&mut self, events: impl IntoIterator<Item = NoteEvent>) {
        self.clear();
        for event in events {
            let id = self.record_event(event.pitch, event.velocity, event.start);
            if let Some(stop) = event.stop {
                // the id was just issued
                let _ = self.record_event_stop(id, stop);
            }
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn RecorderListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn RecorderListener>> {
        let index = self.listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.listeners.remove(index).1)
    }

    fn insert(&mut self, event: NoteEvent) {
        let index = self.events.partition_point(|e| e.start <= event.start);
        if self.playing && index < self.head {
            self.head += 1;
        }
        self.events.insert(index, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::RefCell,
        rc::Rc,
        time::Duration,
    };

    fn recorder() -> Recorder {
        // 120 bpm: 500 ms beats
        Recorder::new(Intervals::new(120.0, 4, 4).unwrap())
    }

    #[test]
    fn note_on_is_ignored_unless_recording() {
        let mut recorder = recorder();
        assert_eq!(recorder.note_on(60, 100, Instant::now()), None);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn note_times_come_from_last_tick() {
        let mut recorder = recorder();
        let t0 = Instant::now();
        recorder.start();
        recorder.tick(TickPosition::new(1, 2), t0);

        recorder.note_on(60, 100, t0 + Duration::from_millis(125));
        recorder.note_off(60, t0 + Duration::from_millis(750));

        let event = &recorder.events()[0];
        assert_eq!((event.start.measure, event.start.beat), (1, 2));
        assert!((event.start.fraction - 0.25).abs() < 1e-9);
        let stop = event.stop.unwrap();
        assert!((stop.fraction - 1.5).abs() < 1e-9);
    }

    #[test]
    fn note_on_before_any_tick_starts_at_zero() {
        let mut recorder = recorder();
        recorder.start();
        recorder.note_on(64, 90, Instant::now());
        assert_eq!(recorder.events()[0].start, Moment::ZERO);
    }

    #[test]
    fn stop_finishes_held_notes() {
        let mut recorder = recorder();
        let t0 = Instant::now();
        recorder.start();
        recorder.tick(TickPosition::new(0, 0), t0);
        recorder.note_on(60, 100, t0);
        recorder.note_on(67, 100, t0);

        let events = recorder.stop(t0 + Duration::from_millis(100));
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.stop.is_some()));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn stop_is_clamped_to_start() {
        let mut recorder = recorder();
        let id = recorder.record_event(60, 64, Moment::new(2, 0, 0.5));
        recorder.record_event_stop(id, Moment::new(1, 0, 0.0)).unwrap();

        let event = recorder.event(id).unwrap();
        assert_eq!(event.stop, Some(event.start));
    }

    #[test]
    fn events_stay_sorted_after_insert_and_update() {
        let mut recorder = recorder();
        let late = recorder.record_event(60, 64, Moment::new(3, 0, 0.0));
        let early = recorder.record_event(62, 64, Moment::new(0, 1, 0.0));
        recorder.record_event(64, 64, Moment::new(1, 0, 0.0));

        let starts: Vec<_> = recorder.events().iter().map(|e| e.start).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(recorder.events()[0].id, early);

        recorder
            .update_event(late, Moment::ZERO, Some(Moment::new(0, 1, 0.0)))
            .unwrap();
        assert_eq!(recorder.events()[0].id, late);
    }

    #[test]
    fn unknown_event_is_an_error() {
        let mut recorder = recorder();
        let missing = EventId(42);
        assert_eq!(
            recorder.record_event_stop(missing, Moment::ZERO),
            Err(RecorderError::UnknownEvent(missing))
        );
    }

    #[test]
    fn playback_yields_due_events_in_order() {
        let mut recorder = recorder();
        let a = recorder.record_event(60, 100, Moment::new(0, 0, 0.5));
        recorder.record_event_stop(a, Moment::new(0, 1, 0.5)).unwrap();
        recorder.record_event(62, 100, Moment::new(0, 2, 0.0));
        recorder.record_event(64, 100, Moment::new(1, 0, 0.0));

        recorder.playback();
        let t0 = Instant::now();

        let first = recorder.tick(TickPosition::new(0, 0), t0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].pitch, 60);
        assert_eq!(first[0].delay, Duration::from_millis(250));
        assert_eq!(first[0].length, Duration::from_millis(500));

        assert!(recorder.tick(TickPosition::new(0, 1), t0).is_empty());

        // a skipped beat still plays everything that became due
        let rest = recorder.tick(TickPosition::new(1, 0), t0);
        let pitches: Vec<_> = rest.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![62, 64]);
    }

    #[test]
    fn clear_returns_events() {
        let mut recorder = recorder();
        recorder.record_event(60, 100, Moment::ZERO);
        let cleared = recorder.clear();
        assert_eq!(cleared.len(), 1);
        assert!(recorder.events().is_empty());
    }

    struct Log(Rc<RefCell<Vec<(&'static str, u8)>>>);

    impl RecorderListener for Log {
        fn note_started(&mut self, event: &NoteEvent) {
            self.0.borrow_mut().push(("start", event.pitch));
        }

        fn note_stopped(&mut self, event: &NoteEvent) {
            self.0.borrow_mut().push(("stop", event.pitch));
        }
    }

    #[test]
    fn listeners_hear_recorded_notes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut recorder = recorder();
        let id = recorder.add_listener(Box::new(Log(log.clone())));

        let now = Instant::now();
        recorder.start();
        recorder.note_on(60, 100, now);
        recorder.note_off(60, now);
        assert_eq!(*log.borrow(), vec![("start", 60), ("stop", 60)]);

        assert!(recorder.remove_listener(id).is_some());
        recorder.note_on(62, 100, now);
        assert_eq!(log.borrow().len(), 2);
    }
}
