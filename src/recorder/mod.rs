//! Piano-roll recorder: captures notes against the clock and plays them back.

pub mod event;
pub mod moment;
pub mod recording;

pub use event::{EventId, NoteEvent, ScheduledNote};
pub use moment::Moment;
pub use recording::{ListenerId, Recorder, RecorderError, RecorderListener};
