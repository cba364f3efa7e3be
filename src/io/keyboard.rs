use std::collections::HashMap;

/// Velocity used for notes played from the computer keyboard.
pub const KEY_VELOCITY: u8 = 63;

/// Two rows of a QWERTY keyboard laid out like piano keys:
///
/// ```text
///    2 3   5 6 7   9 0   =        s d   g h j
///   q w e r t y u i o p [ ]      z x c v b n m
///   C4 ........... up to G5      C3 ........ B3
/// ```
const UPPER_ROW: &str = "q2w3er5t6y7ui9o0p[=]";
const UPPER_BASE: i16 = 60;
const LOWER_ROW: &str = "zsxdcvgbhnjm";
const LOWER_BASE: i16 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    /// The layout moved by this many octaves.
    Octave(i8),
}

/// Turns key presses into notes.
///
/// Remembers which note each held key started so the matching release stops
/// that note even if the octave changed in between.
#[derive(Debug, Clone)]
pub struct KeyMap {
    mapping: HashMap<char, i16>,
    shift: i16,
    held: HashMap<char, u8>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMap {
    pub fn new() -> Self {
        let rows = [(UPPER_ROW, UPPER_BASE), (LOWER_ROW, LOWER_BASE)];
        let mapping = rows
            .iter()
            .flat_map(|(row, base)| row.chars().zip(*base..))
            .collect();
        Self {
            mapping,
            shift: 0,
            held: HashMap::new(),
        }
    }

    /// Octaves the layout is shifted by.
    pub fn octave(&self) -> i8 {
        (self.shift / 12) as i8
    }

    /// Note a key would play right now, if it is mapped and in MIDI range.
    pub fn note_for(&self, key: char) -> Option<u8> {
        let note = self.mapping.get(&key)? + self.shift;
        u8::try_from(note).ok().filter(|n| *n <= 127)
    }

    /// Handle a key press. `modified` is true while Ctrl, Alt or Meta is
    /// held; such presses only move the octave.
    pub fn key_down(&mut self, key: char, modified: bool) -> Option<KeyInput> {
        match key {
            '<' => return Some(self.change_octave(-1)),
            '>' => return Some(self.change_octave(1)),
            _ if modified => return None,
            _ => {}
        }
        if self.held.contains_key(&key) {
            return None;
        }
        let note = self.note_for(key)?;
        self.held.insert(key, note);
        Some(KeyInput::NoteOn {
            note,
            velocity: KEY_VELOCITY,
        })
    }

    pub fn key_up(&mut self, key: char, modified: bool) -> Option<KeyInput> {
        if modified {
            return None;
        }
        let note = self.held.remove(&key)?;
        Some(KeyInput::NoteOff { note })
    }

    /// Forget held keys, returning the notes they were playing.
    pub fn release_all(&mut self) -> Vec<u8> {
        self.held.drain().map(|(_, note)| note).collect()
    }

    pub fn is_held(&self, key: char) -> bool {
        self.held.contains_key(&key)
    }

    fn change_octave(&mut self, delta: i8) -> KeyInput {
        self.shift += delta as i16 * 12;
        KeyInput::Octave(self.octave())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColor {
    White,
    Black,
}

pub fn key_color(note: u8) -> KeyColor {
    match note % 12 {
        1 | 3 | 6 | 8 | 10 => KeyColor::Black,
        _ => KeyColor::White,
    }
}

/// Outside the 88-key piano range.
pub fn is_uncommon(note: u8) -> bool {
    !(21..=108).contains(&note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_piano() {
        let map = KeyMap::new();
        assert_eq!(map.note_for('q'), Some(60));
        assert_eq!(map.note_for('2'), Some(61));
        assert_eq!(map.note_for(']'), Some(79));
        assert_eq!(map.note_for('z'), Some(48));
        assert_eq!(map.note_for('m'), Some(59));
        assert_eq!(map.note_for('a'), None);
    }

    #[test]
    fn octave_shift_moves_every_key() {
        let mut map = KeyMap::new();
        assert_eq!(map.key_down('>', false), Some(KeyInput::Octave(1)));
        assert_eq!(map.note_for('q'), Some(72));
        map.key_down('<', true);
        map.key_down('<', false);
        assert_eq!(map.note_for('z'), Some(36));
        assert_eq!(map.octave(), -1);
    }

    #[test]
    fn release_follows_the_started_note() {
        let mut map = KeyMap::new();
        assert_eq!(
            map.key_down('q', false),
            Some(KeyInput::NoteOn {
                note: 60,
                velocity: KEY_VELOCITY
            })
        );
        // repeat while held is ignored
        assert_eq!(map.key_down('q', false), None);
        map.key_down('>', false);
        assert_eq!(map.key_up('q', false), Some(KeyInput::NoteOff { note: 60 }));
        assert_eq!(map.key_up('q', false), None);
    }

    #[test]
    fn modified_keys_are_ignored() {
        let mut map = KeyMap::new();
        assert_eq!(map.key_down('q', true), None);
        assert!(!map.is_held('q'));
    }

    #[test]
    fn notes_out_of_range_are_dropped() {
        let mut map = KeyMap::new();
        for _ in 0..6 {
            map.key_down('>', false);
        }
        // q would be 132
        assert_eq!(map.key_down('q', false), None);
        for _ in 0..11 {
            map.key_down('<', false);
        }
        // z would be -12
        assert_eq!(map.key_down('z', false), None);
    }

    #[test]
    fn colors() {
        assert_eq!(key_color(60), KeyColor::White);
        assert_eq!(key_color(61), KeyColor::Black);
        assert_eq!(key_color(70), KeyColor::Black);
        assert!(is_uncommon(20));
        assert!(!is_uncommon(60));
    }
}
