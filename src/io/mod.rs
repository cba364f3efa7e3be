// Purpose - external interfaces: MIDI bytes, the computer keyboard, MIDI files

pub mod converter;
pub mod keyboard;
pub mod midi;
pub mod smf;

pub use keyboard::{KeyInput, KeyMap};
pub use midi::MidiEvent;
