use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    clock::{
        intervals::{ClockError, Intervals},
        message::{ClockCommand, ClockMessage},
        metronome::Metronome,
        position::TickPosition,
        time_signature::TimeSignature,
    },
    io::{
        converter::midi_to_synth,
        keyboard::{KeyInput, KeyMap},
        midi::{self, MidiEvent, CC_PAUSE, CC_PLAY, CC_RECORD},
        smf::{self, SmfError},
    },
    recorder::{
        event::EventId,
        moment::Moment,
        recording::{Recorder, RecorderError},
    },
    settings::{Settings, SettingsError},
    synth::message::{MessageSender, SynthMessage},
};

use super::scheduler::Scheduler;

/*
Practice Session
================

The control side of the practice tool. It owns everything that is not
audio rendering and is driven from one thread (the UI loop):

    keys / MIDI bytes ──▶ ┌─────────┐ ── SynthMessage ──▶ keys synth
                          │ Session │ ── SynthMessage ──▶ metronome beeper
    ClockMessage ───────▶ │         │ ── ClockCommand ──▶ clock thread
                          └─────────┘
                           recorder, metronome, scheduler, key map

Transport:

    Stopped ─record─▶ Recording ─pause─▶ Paused ─play─▶ Playing
       ▲                  │                 │              │
       └─────stop─────────┴─────────────────┴──────────────┘

Recording and playing are exclusive. Pausing stops the clock, finishes held
notes and silences the synth. Stopping also forgets the clock position.
A tempo change pauses the session: the clock has to be restarted after it.

Clock ticks feed the metronome (clicks go to the beeper) and the recorder
(playback notes go to the keys synth). Both produce notes that start a
little after the tick, so they pass through deadline queues that
`update` drains.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Recording,
    Paused,
    Playing,
}

impl Transport {
    pub fn is_running(&self) -> bool {
        matches!(self, Transport::Recording | Transport::Playing)
    }
}

pub struct Session<S, C> {
    synth: S,
    beeper: S,
    clock: C,
    transport: Transport,
    intervals: Intervals,
    time_signature: TimeSignature,
    position: Option<TickPosition>,
    recorder: Recorder,
    metronome: Metronome,
    notes: Scheduler,
    clicks: Scheduler,
    keymap: KeyMap,
    /// Key releases for terminals that only report presses
    releases: Vec<(Instant, char)>,
    tap_hold: Duration,
    channel: u8,
    sounding: [bool; 128],
}

impl<S: MessageSender<SynthMessage>, C: MessageSender<ClockCommand>> Session<S, C> {
    pub fn new(settings: &Settings, synth: S, beeper: S, clock: C) -> Result<Self, SettingsError> {
        settings.validate()?;
        let intervals = settings.intervals()?;
        Ok(Self {
            synth,
            beeper,
            clock,
            transport: Transport::Stopped,
            intervals,
            time_signature: settings.time_signature,
            position: None,
            recorder: Recorder::new(intervals),
            metronome: Metronome::new(settings.beep(), settings.active_division),
            notes: Scheduler::new(),
            clicks: Scheduler::new(),
            keymap: KeyMap::new(),
            releases: Vec::new(),
            tap_hold: settings.tap_hold(),
            channel: settings.midi_channel,
            sounding: [false; 128],
        })
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn intervals(&self) -> &Intervals {
        &self.intervals
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// Last clock position, `None` until the first tick after a stop.
    pub fn position(&self) -> Option<TickPosition> {
        self.position
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn is_sounding(&self, note: u8) -> bool {
        self.sounding.get(note as usize).copied().unwrap_or(false)
    }

    // transport

    pub fn record(&mut self) -> bool {
        if self.transport.is_running() {
            return false;
        }
        info!("recording at {:.1} bpm", self.intervals.bpm());
        self.recorder.start();
        self.start_clock();
        self.transport = Transport::Recording;
        true
    }

    pub fn play(&mut self) -> bool {
        if self.transport.is_running() {
            return false;
        }
        info!("playing {} events", self.recorder.events().len());
        self.recorder.playback();
        self.start_clock();
        self.transport = Transport::Playing;
        true
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        if !self.transport.is_running() {
            return false;
        }
        self.send_clock(ClockCommand::Stop);
        self.recorder.stop(now);
        self.silence();
        self.transport = Transport::Paused;
        true
    }

    pub fn stop(&mut self, now: Instant) {
        self.pause(now);
        self.position = None;
        self.transport = Transport::Stopped;
    }

    /// Space bar: pause while running, otherwise play.
    pub fn toggle_play(&mut self, now: Instant) {
        if self.transport.is_running() {
            self.pause(now);
        } else {
            self.play();
        }
    }

    fn start_clock(&mut self) {
        self.metronome.reset();
        self.position = None;
        self.send_clock(ClockCommand::Start);
    }

    fn silence(&mut self) {
        self.notes.clear();
        self.clicks.clear();
        self.releases.clear();
        self.keymap.release_all();
        self.sounding = [false; 128];
        self.send_synth(SynthMessage::AllNotesOff);
    }

    /// Change the tempo. Pauses the session; the clock must be restarted.
    pub fn set_tempo(&mut self, bpm: f64, now: Instant) -> Result<(), ClockError> {
        let intervals = Intervals::new(
            bpm,
            self.intervals.divisions(),
            self.intervals.beats_per_measure(),
        )?;
        self.retime(intervals, now);
        Ok(())
    }

    /// Change the meter. Recorded notes keep their beat count from the
    /// start, so they land in other measures. Pauses the session.
    pub fn set_time_signature(
        &mut self,
        time_signature: TimeSignature,
        now: Instant,
    ) -> Result<(), SettingsError> {
        let beats = time_signature
            .beats_per_measure()
            .ok_or(SettingsError::TimeSignature(time_signature))?;
        let intervals = Intervals::new(self.intervals.bpm(), self.intervals.divisions(), beats)?;

        let from = self.intervals.beats_per_measure();
        if from != beats {
            let moved: Vec<_> = self
                .recorder
                .events()
                .iter()
                .map(|e| {
                    let start = remeter(e.start, from, beats);
                    (e.id, start, e.stop.map(|m| remeter(m, from, beats)))
                })
                .collect();
            for (id, start, stop) in moved {
                if let Err(err) = self.recorder.update_event(id, start, stop) {
                    debug!("cannot move event to the new meter: {}", err);
                }
            }
        }
        info!(
            "time signature {}/{}",
            time_signature.numerator, time_signature.denominator
        );
        self.time_signature = time_signature;
        self.retime(intervals, now);
        Ok(())
    }

    fn retime(&mut self, intervals: Intervals, now: Instant) {
        self.pause(now);
        self.send_clock(ClockCommand::Stop);
        self.send_clock(ClockCommand::SetTempo {
            bpm: intervals.bpm(),
            divisions: intervals.divisions(),
            beats_per_measure: intervals.beats_per_measure(),
        });
        self.apply_intervals(intervals);
    }

    pub fn nudge_tempo(&mut self, delta: f64, now: Instant) {
        let bpm = (self.intervals.bpm() + delta).max(1.0);
        if let Err(err) = self.set_tempo(bpm, now) {
            debug!("ignoring tempo change: {}", err);
        }
    }

    fn apply_intervals(&mut self, intervals: Intervals) {
        self.intervals = intervals;
        self.recorder.set_intervals(intervals);
    }

    // clock

    pub fn handle_clock(&mut self, message: ClockMessage) {
        match message {
            // a reply to a SetTempo sent before the last meter change
            ClockMessage::Intervals(intervals)
                if intervals.beats_per_measure() != self.intervals.beats_per_measure() =>
            {
                debug!("ignoring intervals in a stale meter");
            }
            ClockMessage::Intervals(intervals) => self.apply_intervals(intervals),
            ClockMessage::Tick {
                position,
                timestamp,
            } => {
                if !self.transport.is_running() {
                    return;
                }
                self.position = Some(position);
                for click in self.metronome.on_tick(&position, &self.intervals) {
                    self.clicks.enqueue(timestamp + click.delay, click.message());
                }
                for note in self.recorder.tick(position, timestamp) {
                    self.notes.schedule_note(timestamp, &note);
                }
            }
        }
    }

    /// Send everything that became due and release tapped keys.
    pub fn update(&mut self, now: Instant) {
        for message in self.notes.drain_due(now) {
            self.mark(&message);
            self.send_synth(message);
        }
        for message in self.clicks.drain_due(now) {
            if self.beeper.push(message).is_err() {
                warn!("beeper queue full, dropped click");
            }
        }

        let mut index = 0;
        while index < self.releases.len() {
            if self.releases[index].0 <= now {
                let (_, key) = self.releases.swap_remove(index);
                self.key_up(key, false, now);
            } else {
                index += 1;
            }
        }
    }

    // input

    pub fn note_on(&mut self, note: u8, velocity: u8, now: Instant) {
        let message = SynthMessage::NoteOn { note, velocity };
        self.mark(&message);
        self.send_synth(message);
        self.recorder.note_on(note, velocity, now);
    }

    pub fn note_off(&mut self, note: u8, now: Instant) {
        let message = SynthMessage::NoteOff { note, velocity: 0 };
        self.mark(&message);
        self.send_synth(message);
        self.recorder.note_off(note, now);
    }

    pub fn key_down(&mut self, key: char, modified: bool, now: Instant) -> Option<KeyInput> {
        let input = self.keymap.key_down(key, modified)?;
        if let KeyInput::NoteOn { note, velocity } = input {
            self.note_on(note, velocity, now);
        }
        Some(input)
    }

    pub fn key_up(&mut self, key: char, modified: bool, now: Instant) -> Option<KeyInput> {
        let input = self.keymap.key_up(key, modified)?;
        if let KeyInput::NoteOff { note } = input {
            self.note_off(note, now);
        }
        Some(input)
    }

    /// A key press without a matching release: the note is released
    /// `tap_hold` later. Pressing the key again before then extends it.
    pub fn tap(&mut self, key: char, modified: bool, now: Instant) -> Option<KeyInput> {
        let release = now + self.tap_hold;
        if let Some(pending) = self.releases.iter_mut().find(|(_, k)| *k == key) {
            pending.0 = release;
            return None;
        }
        let input = self.key_down(key, modified, now)?;
        if matches!(input, KeyInput::NoteOn { .. }) {
            self.releases.push((release, key));
        }
        Some(input)
    }

    /// Handle one raw MIDI message from a controller.
    pub fn midi(&mut self, bytes: &[u8], now: Instant) {
        let Some(event) = midi::parse(bytes) else {
            debug!("ignoring MIDI bytes {:02x?}", bytes);
            return;
        };
        match event {
            MidiEvent::ControlChange {
                controller, value, ..
            } if value == 127 && matches!(controller, CC_PLAY | CC_PAUSE | CC_RECORD) => {
                match controller {
                    CC_PLAY => {
                        self.play();
                    }
                    CC_PAUSE => {
                        self.pause(now);
                    }
                    _ => {
                        self.record();
                    }
                }
            }
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } if channel == self.channel => self.note_on(key, velocity, now),
            MidiEvent::NoteOff { channel, key, .. } if channel == self.channel => {
                self.note_off(key, now)
            }
            other => {
                if let Some(message) = midi_to_synth(other, self.channel) {
                    self.send_synth(message);
                }
            }
        }
    }

    pub fn toggle_chorus(&mut self) {
        self.send_synth(SynthMessage::ToggleChorus);
    }

    /// Mute or unmute the metronome. Returns true when muted.
    pub fn toggle_metronome(&mut self) -> bool {
        self.metronome.toggle_muted()
    }

    pub fn set_active_division(&mut self, division: usize) {
        self.metronome
            .set_active_division(division.min(self.intervals.divisions()));
    }

    // recordings

    pub fn clear(&mut self) -> usize {
        self.recorder.clear().len()
    }

    /// Move a recorded note by `delta_beats`. The start snaps to the nearest
    /// division of the beat and the note keeps its length.
    pub fn move_event(&mut self, id: EventId, delta_beats: f64) -> Result<(), RecorderError> {
        let beats = self.intervals.beats_per_measure();
        let steps = self.intervals.divisions() as f64;
        let event = self
            .recorder
            .event(id)
            .ok_or(RecorderError::UnknownEvent(id))?;

        let target = ((event.start.to_beats(beats) + delta_beats) * steps).round() / steps;
        let start = Moment::from_beats(target, beats, None);
        let stop = event
            .stop
            .map(|_| start.offset(event.length_beats(beats), beats));
        self.recorder.update_event(id, start, stop)
    }

    /// Change a recorded note's pitch and sound the new pitch once.
    pub fn set_event_pitch(&mut self, id: EventId, pitch: u8) -> Result<(), RecorderError> {
        self.recorder.set_pitch(id, pitch)?;
        if let Some(event) = self.recorder.event(id) {
            let message = SynthMessage::Play {
                note: event.pitch,
                velocity: event.velocity,
                duration: self.tap_hold,
            };
            self.send_synth(message);
        }
        Ok(())
    }

    pub fn remove_event(&mut self, id: EventId) -> Result<(), RecorderError> {
        self.recorder.remove_event(id).map(|event| {
            debug!("removed event {} ({})", id, event.pitch);
        })
    }

    pub fn export_smf(&self) -> Result<Vec<u8>, SmfError> {
        smf::write_smf(
            self.recorder.events(),
            &self.intervals,
            self.time_signature,
        )
    }

    /// Replace the recording with the notes of a MIDI file, adopting its
    /// tempo and meter. Returns the number of notes loaded.
    ///
    /// A file without a usable time signature is read as 4/4 and its notes
    /// are moved into the session's meter.
    pub fn import_smf(&mut self, bytes: &[u8], now: Instant) -> Result<usize, SmfError> {
        let import = smf::read_smf(bytes)?;
        let meter = import
            .time_signature
            .and_then(|ts| Some((ts, ts.beats_per_measure()?)));
        let (time_signature, beats) =
            meter.unwrap_or((self.time_signature, self.intervals.beats_per_measure()));
        let file_beats = meter.map_or(4, |(_, beats)| beats);

        let divisions = self.intervals.divisions();
        let bpm = import.bpm.unwrap_or(self.intervals.bpm());
        let intervals = Intervals::new(bpm, divisions, beats)
            .or_else(|err| {
                warn!("MIDI file tempo not usable: {}", err);
                Intervals::new(self.intervals.bpm(), divisions, beats)
            })
            .unwrap_or(self.intervals);

        let events = import.events.into_iter().map(|mut event| {
            if file_beats != beats {
                event.start = remeter(event.start, file_beats, beats);
                event.stop = event.stop.map(|m| remeter(m, file_beats, beats));
            }
            event
        });
        self.recorder.load(events);

        if intervals != self.intervals || time_signature != self.time_signature {
            self.time_signature = time_signature;
            self.retime(intervals, now);
        }
        let count = self.recorder.events().len();
        info!("imported {} notes", count);
        Ok(count)
    }

    fn mark(&mut self, message: &SynthMessage) {
        match *message {
            SynthMessage::NoteOn { note, velocity } if note < 128 => {
                self.sounding[note as usize] = velocity > 0;
            }
            SynthMessage::NoteOff { note, .. } if note < 128 => {
                self.sounding[note as usize] = false;
            }
            _ => {}
        }
    }

    fn send_synth(&mut self, message: SynthMessage) {
        if let Err(message) = self.synth.push(message) {
            warn!("synth queue full, dropped {:?}", message);
        }
    }

    fn send_clock(&mut self, command: ClockCommand) {
        if let Err(command) = self.clock.push(command) {
            warn!("clock queue full, dropped {:?}", command);
        }
    }
}

/// The same number of beats from the start, counted in another meter.
fn remeter(moment: Moment, from: u32, to: u32) -> Moment {
    Moment::from_beats(moment.to_beats(from), to, None)
}
