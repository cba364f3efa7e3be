//! Clock thread
//!
//! Runs a [`TickClock`] on its own thread so ticks keep coming while the
//! UI is busy drawing. The thread and its owner talk through two one-way
//! `rtrb` ring buffers: commands in, messages out. Nothing is shared.
//!
//! ```text
//!   owner ── ClockCommand ──▶ [clock thread] ── ClockMessage ──▶ owner
//!            SetTempo            poll every            Intervals
//!            Start / Stop        poll_interval         Tick { position, timestamp }
//!            Shutdown
//! ```

use std::{
    io,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::synth::message::MessageSender;

use super::{
    intervals::Intervals,
    message::{ClockCommand, ClockMessage},
    tick_clock::TickClock,
};

const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct ClockConfig {
    pub intervals: Intervals,
    pub poll_interval: Duration,
}

impl ClockConfig {
    pub fn new(intervals: Intervals) -> Self {
        Self {
            intervals,
            poll_interval: Duration::from_millis(5),
        }
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_micros(100));
        self
    }
}

/// Owner side of the clock thread. Dropping it stops and joins the thread.
pub struct ClockHandle {
    commands: Producer<ClockCommand>,
    messages: Consumer<ClockMessage>,
    poll_interval: Duration,
    thread: Option<JoinHandle<()>>,
}

impl ClockHandle {
    /// Queue a command. Hands the command back if the queue is full.
    pub fn send(&mut self, command: ClockCommand) -> Result<(), ClockCommand> {
        self.commands.push(command).map_err(|err| match err {
            rtrb::PushError::Full(command) => command,
        })
    }

    pub fn try_recv(&mut self) -> Option<ClockMessage> {
        self.messages.pop().ok()
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        while self.commands.push(ClockCommand::Shutdown).is_err() {
            if thread.is_finished() {
                break;
            }
            thread::sleep(self.poll_interval);
        }

        if thread.join().is_err() {
            warn!("clock thread panicked");
        }
    }
}

impl MessageSender<ClockCommand> for ClockHandle {
    fn push(&mut self, command: ClockCommand) -> Result<(), ClockCommand> {
        self.send(command)
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.join();
    }
}

pub fn spawn(config: ClockConfig) -> io::Result<ClockHandle> {
    let (commands, command_rx) = RingBuffer::<ClockCommand>::new(QUEUE_CAPACITY);
    let (message_tx, messages) = RingBuffer::<ClockMessage>::new(QUEUE_CAPACITY);

    let clock = TickClock::new(config.intervals);
    let poll_interval = config.poll_interval;
    let thread = thread::Builder::new()
        .name("keyroll-clock".into())
        .spawn(move || run(clock, command_rx, message_tx, poll_interval))?;

    Ok(ClockHandle {
        commands,
        messages,
        poll_interval,
        thread: Some(thread),
    })
}

fn run(
    mut clock: TickClock,
    mut commands: Consumer<ClockCommand>,
    mut messages: Producer<ClockMessage>,
    poll_interval: Duration,
) {
    info!("clock thread started, polling every {:?}", poll_interval);

    loop {
        while let Ok(command) = commands.pop() {
            match command {
                ClockCommand::SetTempo {
                    bpm,
                    divisions,
                    beats_per_measure,
                } => match clock.set_tempo(bpm, divisions, beats_per_measure) {
                    Ok(intervals) => {
                        if messages.push(ClockMessage::Intervals(*intervals)).is_err() {
                            warn!("clock message queue full, dropped intervals");
                        }
                    }
                    Err(err) => debug!("ignoring tempo change: {}", err),
                },
                ClockCommand::Start => clock.start(Instant::now()),
                ClockCommand::Stop => clock.stop(),
                ClockCommand::Shutdown => {
                    info!("clock thread stopping");
                    return;
                }
            }
        }

        if commands.is_abandoned() {
            return;
        }

        let now = Instant::now();
        if let Some(position) = clock.poll(now) {
            let tick = ClockMessage::Tick {
                position,
                timestamp: now,
            };
            if messages.push(tick).is_err() {
                debug!("clock message queue full, dropped tick {}", position);
            }
        }

        thread::sleep(poll_interval);
    }
}
