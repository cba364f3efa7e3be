//! Practice session settings.
//!
//! Everything has a default, so a settings file only needs the values it
//! changes:
//!
//! ```json
//! { "bpm": 96, "time_signature": { "numerator": 3, "denominator": 4 } }
//! ```

use std::{fmt, path::PathBuf, time::Duration};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    clock::{
        intervals::{ClockError, Intervals, MAX_DIVISIONS},
        time_signature::TimeSignature,
    },
    synth::voice::DEFAULT_DETUNE,
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bpm: f64,
    /// Highest beat subdivision the clock tracks
    pub divisions: usize,
    pub time_signature: TimeSignature,
    /// Subdivision the metronome clicks on (0 = beats only)
    pub active_division: usize,
    /// Length of a metronome click in seconds
    pub beep_duration: f64,
    /// Volume of the metronome relative to the keys
    pub beep_gain: f32,
    pub polyphony: usize,
    /// Vibrato rate in Hz
    pub lfo_frequency: f32,
    /// Pitch wheel range in semitones
    pub bend_range: u8,
    /// Frequency ratio of the chorus oscillator
    pub detune: f32,
    pub poll_interval_ms: u64,
    /// How long a key sounds when the terminal reports no key release
    pub tap_hold_ms: u64,
    /// Impulse response for the reverb; reverb stays off without one
    pub impulse: Option<PathBuf>,
    pub midi_channel: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpm: 125.0,
            divisions: 8,
            time_signature: TimeSignature::FOUR_FOUR,
            active_division: 2,
            beep_duration: 0.05,
            beep_gain: 0.5,
            polyphony: 12,
            lfo_frequency: 4.0,
            bend_range: 2,
            detune: DEFAULT_DETUNE,
            poll_interval_ms: 5,
            tap_hold_ms: 200,
            impulse: None,
            midi_channel: 0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json).map_err(SettingsError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(SettingsError::Io)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.intervals()?;
        if self.active_division > self.divisions {
            return Err(SettingsError::Invalid(
                "active_division",
                format!("{} exceeds divisions ({})", self.active_division, self.divisions),
            ));
        }
        if self.polyphony == 0 {
            return Err(SettingsError::Invalid(
                "polyphony",
                "need at least one voice".into(),
            ));
        }
        if !(self.beep_duration > 0.0 && self.beep_duration.is_finite()) {
            return Err(SettingsError::Invalid(
                "beep_duration",
                format!("{} is not a positive number of seconds", self.beep_duration),
            ));
        }
        if self.midi_channel > 15 {
            return Err(SettingsError::Invalid(
                "midi_channel",
                format!("{} is not a channel (0 to 15)", self.midi_channel),
            ));
        }
        if self.bend_range > 24 {
            return Err(SettingsError::Invalid(
                "bend_range",
                format!("{} semitones is more than two octaves", self.bend_range),
            ));
        }
        Ok(())
    }

    pub fn beats_per_measure(&self) -> Result<u32, SettingsError> {
        self.time_signature
            .beats_per_measure()
            .ok_or(SettingsError::TimeSignature(self.time_signature))
    }

    pub fn intervals(&self) -> Result<Intervals, SettingsError> {
        Ok(Intervals::new(
            self.bpm,
            self.divisions,
            self.beats_per_measure()?,
        )?)
    }

    pub fn beep(&self) -> Duration {
        Duration::from_secs_f64(self.beep_duration.clamp(0.0, 10.0))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tap_hold(&self) -> Duration {
        Duration::from_millis(self.tap_hold_ms)
    }
}

#[derive(Debug)]
pub enum SettingsError {
    #[cfg(feature = "serde")]
    Parse(serde_json::Error),
    Io(std::io::Error),
    Clock(ClockError),
    /// The measure is not a whole number of quarter beats
    TimeSignature(TimeSignature),
    Invalid(&'static str, String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "serde")]
            SettingsError::Parse(err) => write!(f, "cannot parse settings: {}", err),
            SettingsError::Io(err) => write!(f, "cannot read settings: {}", err),
            SettingsError::Clock(err) => write!(f, "{}", err),
            SettingsError::TimeSignature(ts) => write!(
                f,
                "time signature {}/{} does not divide into quarter beats",
                ts.numerator, ts.denominator
            ),
            SettingsError::Invalid(field, reason) => write!(f, "invalid {}: {}", field, reason),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "serde")]
            SettingsError::Parse(err) => Some(err),
            SettingsError::Io(err) => Some(err),
            SettingsError::Clock(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClockError> for SettingsError {
    fn from(err: ClockError) -> Self {
        SettingsError::Clock(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        let intervals = settings.intervals().unwrap();
        assert_eq!(intervals.beat(), 480.0);
        assert_eq!(intervals.measure(), 1920.0);
    }

    #[test]
    fn uneven_meter_is_rejected() {
        let settings = Settings {
            time_signature: TimeSignature::new(7, 8),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::TimeSignature(_))
        ));
    }

    #[test]
    fn bad_tempo_is_rejected() {
        let settings = Settings {
            bpm: 0.0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Clock(ClockError::InvalidTempo(_)))
        ));
        let settings = Settings {
            divisions: MAX_DIVISIONS + 1,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            Settings::from_json(r#"{ "bpm": 96, "time_signature": { "numerator": 3, "denominator": 4 } }"#)
                .unwrap();
        assert_eq!(settings.bpm, 96.0);
        assert_eq!(settings.time_signature, TimeSignature::THREE_FOUR);
        assert_eq!(settings.polyphony, 12);
        assert_eq!(settings.impulse, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Settings::from_json("{ bpm: }"),
            Err(SettingsError::Parse(_))
        ));
    }
}
