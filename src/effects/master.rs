use log::{debug, warn};

use crate::{
    dsp::{
        compressor::{Compressor, CompressorParams},
        convolution::Convolver,
    },
    graph::node::{GraphNode, RenderCtx},
    synth::message::{MessageReceiver, MessageSender},
};

use super::{
    eq::{EqBand, Equalizer},
    rack::EffectRack,
};

/*
Master Bus
==========

Everything the synth produces passes through one fixed chain before it
reaches the device:

    input ──▶ volume ──▶ EffectRack ──▶ Equalizer ──▶ Compressor ──▶ output
                         (reverb,      (low/mid/     (-6 dB, 12:1,
                          overdrive)    high bands)    40 dB knee)

Control changes arrive as `BusMessage`s over the same kind of lock-free
queue the synth uses; they are drained at the top of every block so the
audio thread never waits on the UI.

A replaced reverb goes back to the control side over a second queue, so
its buffers are freed there and not in the audio callback:

    UI ── BusMessage::SetReverb(new) ──▶ MasterBus ── old Convolver ──▶ UI
*/

/// Control changes for the master bus.
#[derive(Debug)]
pub enum BusMessage {
    SetVolume(f32),
    SetOverdrive(f32),
    SetEqBand { band: EqBand, gain_db: f32 },
    /// Replace the reverb; `None` turns it off.
    SetReverb(Option<Box<Convolver>>),
}

pub struct MasterBus<R, G> {
    volume: f32,
    rack: EffectRack,
    eq: Equalizer,
    compressor: Compressor,
    rx: R,
    retired: G,
}

impl<R, G> MasterBus<R, G>
where
    R: MessageReceiver<BusMessage>,
    G: MessageSender<Box<Convolver>>,
{
    /// `retired` receives every reverb the bus lets go of.
    pub fn new(sample_rate: f32, rx: R, retired: G) -> Self {
        Self {
            volume: 1.0,
            rack: EffectRack::new(),
            eq: Equalizer::new(sample_rate),
            compressor: Compressor::new(sample_rate, CompressorParams::default()),
            rx,
            retired,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn rack(&self) -> &EffectRack {
        &self.rack
    }

    pub fn eq(&self) -> &Equalizer {
        &self.eq
    }

    pub fn apply(&mut self, message: BusMessage) {
        match message {
            BusMessage::SetVolume(volume) => self.volume = volume.clamp(0.0, 1.0),
            BusMessage::SetOverdrive(k) => self.rack.set_overdrive(k),
            BusMessage::SetEqBand { band, gain_db } => self.eq.set_band(band, gain_db),
            BusMessage::SetReverb(reverb) => {
                debug!("reverb {}", if reverb.is_some() { "on" } else { "off" });
                if let Some(old) = self.rack.set_reverb(reverb) {
                    // a full queue leaves no choice but to free it here
                    if self.retired.push(old).is_err() {
                        warn!("retired reverb queue full, freeing on the audio thread");
                    }
                }
            }
        }
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        while let Some(message) = self.rx.pop() {
            self.apply(message);
        }

        if self.volume != 1.0 {
            for sample in buffer.iter_mut() {
                *sample *= self.volume;
            }
        }
        self.rack.process(buffer);
        self.eq.process(buffer);
        self.compressor.process(buffer);
    }
}

impl<R, G> GraphNode for MasterBus<R, G>
where
    R: MessageReceiver<BusMessage> + Send,
    G: MessageSender<Box<Convolver>> + Send,
{
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        self.process(out);
    }
}
