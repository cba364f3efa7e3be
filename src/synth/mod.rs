// Purpose: Voice management, polyphony, note messages
// This layer sits on top of the dsp primitives and feeds the master bus

pub mod message;
pub mod pool;
pub mod poly;
pub mod voice;

pub use message::{MessageReceiver, MessageSender, SynthMessage};
pub use pool::{VoiceId, VoicePool};
pub use poly::PolySynth;
pub use voice::{Voice, VoiceState};
