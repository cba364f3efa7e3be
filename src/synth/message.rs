use std::{collections::VecDeque, time::Duration};

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    /// A timed note that releases itself after `duration`
    Play {
        note: u8,
        velocity: u8,
        duration: Duration,
    },
    /// 14-bit pitch wheel, centered on 0 (-8192..=8191)
    PitchBend { value: i16 },
    /// Mod wheel position (0..=127), drives vibrato depth
    ModWheel { value: u8 },
    ToggleChorus,
    AllNotesOff,
}

/// Audio-side end of a message queue
pub trait MessageReceiver<M> {
    fn pop(&mut self) -> Option<M>;
}

/// Control-side end of a message queue
pub trait MessageSender<M> {
    /// Queue a message, handing it back if there is no room.
    fn push(&mut self, message: M) -> Result<(), M>;
}

#[cfg(feature = "rtrb")]
impl<M> MessageReceiver<M> for Consumer<M> {
    fn pop(&mut self) -> Option<M> {
        Consumer::pop(self).ok()
    }
}

#[cfg(feature = "rtrb")]
impl<M> MessageSender<M> for Producer<M> {
    fn push(&mut self, message: M) -> Result<(), M> {
        Producer::push(self, message).map_err(|err| match err {
            rtrb::PushError::Full(message) => message,
        })
    }
}

impl<M> MessageReceiver<M> for VecDeque<M> {
    fn pop(&mut self) -> Option<M> {
        self.pop_front()
    }
}

impl<M> MessageSender<M> for VecDeque<M> {
    fn push(&mut self, message: M) -> Result<(), M> {
        self.push_back(message);
        Ok(())
    }
}
