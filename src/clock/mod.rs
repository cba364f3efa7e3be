//! Musical time: tempo intervals, the tick clock and the metronome.

pub mod intervals;
pub mod message;
pub mod metronome;
pub mod position;
pub mod tick_clock;
pub mod time_signature;
#[cfg(feature = "rtrb")]
pub mod worker;

pub use intervals::{ClockError, Intervals, MAX_DIVISIONS};
pub use message::{ClockCommand, ClockMessage};
pub use metronome::{Click, Metronome};
pub use position::TickPosition;
pub use tick_clock::TickClock;
pub use time_signature::TimeSignature;
#[cfg(feature = "rtrb")]
pub use worker::{ClockConfig, ClockHandle};
