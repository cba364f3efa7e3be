// Purpose: the control side of a practice session: deadline scheduling of
// notes and clicks, transport, and routing of keyboard and MIDI input.

pub mod scheduler;
pub mod session;

pub use scheduler::Scheduler;
pub use session::{Session, Transport};
