use crate::{
    io::midi::{MidiEvent, CC_MOD_WHEEL},
    synth::message::SynthMessage,
};

/// Map a MIDI event on `channel_filter` to a synth message. Transport
/// controllers and other channels are not synth input and yield `None`.
pub fn midi_to_synth(midi: MidiEvent, channel_filter: u8) -> Option<SynthMessage> {
    if midi.channel() != channel_filter {
        return None;
    }
    match midi {
        MidiEvent::NoteOn { key, velocity, .. } => Some(SynthMessage::NoteOn {
            note: key,
            velocity,
        }),
        MidiEvent::NoteOff { key, velocity, .. } => Some(SynthMessage::NoteOff {
            note: key,
            velocity,
        }),
        MidiEvent::PitchBend { value, .. } => Some(SynthMessage::PitchBend { value }),
        MidiEvent::ControlChange {
            controller: CC_MOD_WHEEL,
            value,
            ..
        } => Some(SynthMessage::ModWheel { value }),
        _ => None,
    }
}

/// Equal temperament, A4 (note 69) = 440 Hz.
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn filters_channel() {
        let event = MidiEvent::NoteOn {
            channel: 2,
            key: 60,
            velocity: 90,
        };
        assert_eq!(midi_to_synth(event, 0), None);
        assert_eq!(
            midi_to_synth(event, 2),
            Some(SynthMessage::NoteOn {
                note: 60,
                velocity: 90
            })
        );
    }

    #[test]
    fn mod_wheel_and_bend() {
        let wheel = MidiEvent::ControlChange {
            channel: 0,
            controller: CC_MOD_WHEEL,
            value: 64,
        };
        assert_eq!(
            midi_to_synth(wheel, 0),
            Some(SynthMessage::ModWheel { value: 64 })
        );

        let bend = MidiEvent::PitchBend {
            channel: 0,
            value: -100,
        };
        assert_eq!(
            midi_to_synth(bend, 0),
            Some(SynthMessage::PitchBend { value: -100 })
        );

        let other = MidiEvent::ControlChange {
            channel: 0,
            controller: 7,
            value: 100,
        };
        assert_eq!(midi_to_synth(other, 0), None);
    }
}
