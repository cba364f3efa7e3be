// Purpose: the master effect chain (reverb, overdrive, EQ, compression) and
// the impulse-response loader feeding its reverb.

pub mod eq;
pub mod impulse;
pub mod master;
pub mod rack;

pub use eq::{EqBand, Equalizer};
pub use impulse::{ImpulseError, ImpulseResponse};
pub use master::{BusMessage, MasterBus};
pub use rack::EffectRack;
