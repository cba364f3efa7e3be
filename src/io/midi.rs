//! Raw MIDI channel messages.
//!
//! Only the channel voice messages the synth reacts to are decoded. Running
//! status, system messages and sysex are not handled; whatever delivers the
//! bytes is expected to hand over one complete message at a time.

/// Controller number of the modulation wheel.
pub const CC_MOD_WHEEL: u8 = 1;
/// Transport pads on a Launchkey-style controller (pressed = 127).
pub const CC_PLAY: u8 = 115;
pub const CC_PAUSE: u8 = 116;
pub const CC_RECORD: u8 = 117;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Centered 14-bit value, -8192..=8191.
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }
}

/// Decode one channel message. Returns `None` for anything that is not a
/// complete, supported message.
///
/// A note-on with velocity 0 is reported as a note-off.
pub fn parse(bytes: &[u8]) -> Option<MidiEvent> {
    let (&status, data) = bytes.split_first()?;
    if status & 0x80 == 0 {
        return None;
    }
    let channel = status & 0x0f;
    let data_byte = |i: usize| data.get(i).map(|b| b & 0x7f);

    let event = match status >> 4 {
        0x8 => MidiEvent::NoteOff {
            channel,
            key: data_byte(0)?,
            velocity: data_byte(1)?,
        },
        0x9 => {
            let key = data_byte(0)?;
            let velocity = data_byte(1)?;
            if velocity == 0 {
                MidiEvent::NoteOff {
                    channel,
                    key,
                    velocity,
                }
            } else {
                MidiEvent::NoteOn {
                    channel,
                    key,
                    velocity,
                }
            }
        }
        0xb => MidiEvent::ControlChange {
            channel,
            controller: data_byte(0)?,
            value: data_byte(1)?,
        },
        0xc => MidiEvent::ProgramChange {
            channel,
            program: data_byte(0)?,
        },
        0xe => {
            let lsb = data_byte(0)? as i16;
            let msb = data_byte(1)? as i16;
            MidiEvent::PitchBend {
                channel,
                value: ((msb << 7) | lsb) - 8192,
            }
        }
        _ => return None,
    };
    Some(event)
}
