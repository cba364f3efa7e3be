//! Standard MIDI File export and import of recorded notes.
//!
//! Export writes a format 0 file: one track holding the tempo, the time
//! signature, and a note-on/note-off pair per recorded event, at
//! `PPQ` ticks per quarter note. Import accepts format 0 or 1 files with
//! metrical timing and pairs note-ons with note-offs per key, first in
//! first out.

use std::{fmt, io};

use log::debug;
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};

use crate::{
    clock::{intervals::Intervals, time_signature::TimeSignature},
    recorder::{
        event::{EventId, NoteEvent},
        moment::Moment,
    },
};

/// Ticks per quarter note in exported files.
pub const PPQ: u16 = 480;

/// Notes and timing read from a MIDI file
#[derive(Debug, Clone, PartialEq)]
pub struct SmfImport {
    pub events: Vec<NoteEvent>,
    /// Tempo of the first tempo event, if any
    pub bpm: Option<f64>,
    /// First time signature, if any
    pub time_signature: Option<TimeSignature>,
}

#[derive(Debug)]
pub enum SmfError {
    Parse(midly::Error),
    Io(io::Error),
    /// SMPTE timecode files have no beat grid to map onto
    UnsupportedTiming,
}

impl fmt::Display for SmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmfError::Parse(err) => write!(f, "invalid MIDI file: {}", err),
            SmfError::Io(err) => write!(f, "cannot write MIDI file: {}", err),
            SmfError::UnsupportedTiming => write!(f, "timecode-based MIDI files are not supported"),
        }
    }
}

impl std::error::Error for SmfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SmfError::Parse(err) => Some(err),
            SmfError::Io(err) => Some(err),
            SmfError::UnsupportedTiming => None,
        }
    }
}

impl From<midly::Error> for SmfError {
    fn from(err: midly::Error) -> Self {
        SmfError::Parse(err)
    }
}

impl From<io::Error> for SmfError {
    fn from(err: io::Error) -> Self {
        SmfError::Io(err)
    }
}

const MAX_TICK: u32 = 0x0fff_ffff;
const MAX_TEMPO: u32 = 0x00ff_ffff;

fn beats_to_ticks(beats: f64) -> u32 {
    (beats * PPQ as f64).round().clamp(0.0, MAX_TICK as f64) as u32
}

/// Encode recorded events as a format 0 MIDI file.
pub fn write_smf(
    events: &[NoteEvent],
    intervals: &Intervals,
    time_signature: TimeSignature,
) -> Result<Vec<u8>, SmfError> {
    let beats_per_measure = intervals.beats_per_measure();
    let channel = u4::new(0);

    // At equal ticks: note-offs of earlier notes, then note-ons, then the
    // note-offs of zero-length notes, which must follow their own note-on.
    let mut timeline: Vec<(u32, u8, MidiMessage)> = Vec::with_capacity(events.len() * 2);
    for event in events {
        let key = u7::new(event.pitch.min(127));
        let start = beats_to_ticks(event.start.to_beats(beats_per_measure));
        let end = beats_to_ticks(event.end(beats_per_measure).to_beats(beats_per_measure));
        timeline.push((
            start,
            1,
            MidiMessage::NoteOn {
                key,
                vel: u7::new(event.velocity.clamp(1, 127)),
            },
        ));
        let rank = if end == start { 2 } else { 0 };
        timeline.push((end, rank, MidiMessage::NoteOff { key, vel: u7::new(0) }));
    }
    timeline.sort_by_key(|(tick, rank, _)| (*tick, *rank));

    let micros_per_quarter = (60_000_000.0 / intervals.bpm()).round() as u32;
    let mut track = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(
                micros_per_quarter.min(MAX_TEMPO),
            ))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                time_signature.numerator,
                time_signature.denominator_log2(),
                24,
                8,
            )),
        },
    ];

    let mut last = 0;
    for (tick, _, message) in timeline {
        track.push(TrackEvent {
            delta: u28::new(tick - last),
            kind: TrackEventKind::Midi { channel, message },
        });
        last = tick;
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(PPQ)),
    ));
    smf.tracks.push(track);

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Decode the notes of a MIDI file into recorder events.
///
/// Positions are converted with the file's own time signature when it has a
/// usable one, otherwise with four beats per measure.
pub fn read_smf(bytes: &[u8]) -> Result<SmfImport, SmfError> {
    let smf = Smf::parse(bytes)?;
    let ppq = match smf.header.timing {
        Timing::Metrical(ppq) => ppq.as_int().max(1) as f64,
        Timing::Timecode(..) => return Err(SmfError::UnsupportedTiming),
    };

    let mut bpm = None;
    let mut time_signature = None;
    // (start tick, velocity, key, stop tick)
    let mut notes: Vec<(u64, u8, u8, Option<u64>)> = Vec::new();

    for track in &smf.tracks {
        let mut tick = 0u64;
        let mut open: Vec<Vec<usize>> = vec![Vec::new(); 128];
        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(micros)) if bpm.is_none() => {
                    let micros = micros.as_int().max(1) as f64;
                    bpm = Some(60_000_000.0 / micros);
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, log2, _, _))
                    if time_signature.is_none() =>
                {
                    time_signature = Some(TimeSignature::new(numerator, 1u8 << log2.min(7)));
                }
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open[key.as_int() as usize].push(notes.len());
                        notes.push((tick, vel.as_int(), key.as_int(), None));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let pending = &mut open[key.as_int() as usize];
                        if pending.is_empty() {
                            debug!("note-off without note-on for key {}", key.as_int());
                        } else {
                            let index = pending.remove(0);
                            notes[index].3 = Some(tick);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    let beats_per_measure = time_signature
        .and_then(|ts| ts.beats_per_measure())
        .unwrap_or(4);
    let moment = |tick: u64| Moment::from_beats(tick as f64 / ppq, beats_per_measure, None);

    notes.sort_by_key(|(start, ..)| *start);
    let events = notes
        .into_iter()
        .enumerate()
        .map(|(i, (start, velocity, pitch, stop))| NoteEvent {
            id: EventId(i as u64),
            pitch,
            velocity,
            start: moment(start),
            stop: stop.map(moment),
        })
        .collect();

    Ok(SmfImport {
        events,
        bpm,
        time_signature,
    })
}
