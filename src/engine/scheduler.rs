use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    time::Instant,
};

use crate::{recorder::event::ScheduledNote, synth::message::SynthMessage};

/*
Deadline Scheduler
==================

Playback and metronome clicks are known slightly ahead of time: a clock tick
arrives and says "this note starts 120 ms from now and lasts 400 ms". The
scheduler holds those messages until their deadline:

    enqueue(t0 + 120ms, NoteOn)        ┌──────────────────────────┐
    enqueue(t0 + 520ms, NoteOff)  ───▶ │ min-heap on (deadline,   │
                                       │            insert order) │
    drain_due(now) ◀────────────────── └──────────────────────────┘

Messages with equal deadlines come out in the order they were enqueued, so a
note-off and a note-on for the same key at the same instant keep their
meaning.
*/

struct Entry {
    at: Instant,
    seq: u64,
    message: SynthMessage,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

#[derive(Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, at: Instant, message: SynthMessage) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Entry { at, seq, message }));
    }

    /// Queue a start and a matching stop for a played-back note.
    pub fn schedule_note(&mut self, now: Instant, note: &ScheduledNote) {
        let start = now + note.delay;
        self.enqueue(
            start,
            SynthMessage::NoteOn {
                note: note.pitch,
                velocity: note.velocity,
            },
        );
        self.enqueue(
            start + note.length,
            SynthMessage::NoteOff {
                note: note.pitch,
                velocity: 0,
            },
        );
    }

    /// Remove and return every message whose deadline is at or before `now`.
    pub fn drain_due(&mut self, now: Instant) -> Vec<SynthMessage> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.at > now {
                break;
            }
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.message);
            }
        }
        due
    }

    /// Deadline of the next message, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(entry)| entry.at)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything pending, returning the note-offs among it so held
    /// notes can still be released.
    pub fn clear(&mut self) -> Vec<SynthMessage> {
        self.queue
            .drain()
            .map(|Reverse(entry)| entry.message)
            .filter(|message| matches!(message, SynthMessage::NoteOff { .. }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn on(note: u8) -> SynthMessage {
        SynthMessage::NoteOn { note, velocity: 64 }
    }

    #[test]
    fn drains_in_deadline_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.enqueue(t0 + Duration::from_millis(30), on(3));
        scheduler.enqueue(t0 + Duration::from_millis(10), on(1));
        scheduler.enqueue(t0 + Duration::from_millis(20), on(2));

        assert!(scheduler.drain_due(t0).is_empty());
        assert_eq!(
            scheduler.drain_due(t0 + Duration::from_millis(25)),
            vec![on(1), on(2)]
        );
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_millis(30)));
        assert_eq!(scheduler.drain_due(t0 + Duration::from_secs(1)), vec![on(3)]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn equal_deadlines_keep_insert_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        for note in 0..10 {
            scheduler.enqueue(t0, on(note));
        }
        let notes: Vec<_> = scheduler.drain_due(t0);
        assert_eq!(notes, (0..10).map(on).collect::<Vec<_>>());
    }

    #[test]
    fn scheduled_note_gets_start_and_stop() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_note(
            t0,
            &ScheduledNote {
                pitch: 60,
                velocity: 100,
                delay: Duration::from_millis(100),
                length: Duration::from_millis(200),
            },
        );

        assert!(scheduler.drain_due(t0 + Duration::from_millis(99)).is_empty());
        assert_eq!(
            scheduler.drain_due(t0 + Duration::from_millis(100)),
            vec![SynthMessage::NoteOn {
                note: 60,
                velocity: 100
            }]
        );
        assert_eq!(
            scheduler.drain_due(t0 + Duration::from_millis(300)),
            vec![SynthMessage::NoteOff {
                note: 60,
                velocity: 0
            }]
        );
    }

    #[test]
    fn clear_keeps_pending_releases() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.enqueue(t0, on(60));
        scheduler.enqueue(
            t0,
            SynthMessage::NoteOff {
                note: 60,
                velocity: 0,
            },
        );
        let released = scheduler.clear();
        assert_eq!(released.len(), 1);
        assert!(scheduler.is_empty());
    }
}
