//! Application wiring: audio stream, clock thread, session and input.

use std::{
    fs,
    io::stdout,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use log::{info, warn};
use ratatui::DefaultTerminal;
use rtrb::{Consumer, Producer, RingBuffer};

use keyroll::{
    clock::worker::{self, ClockConfig, ClockHandle},
    dsp::convolution::Convolver,
    effects::{BusMessage, EqBand, ImpulseResponse, MasterBus},
    engine::Session,
    graph::{GraphNode, Mix, NodeExt, RenderCtx},
    recorder::EventId,
    settings::Settings,
    synth::{PolySynth, SynthMessage, VoicePool},
    MAX_BLOCK_SIZE,
};

use crate::ui;

pub type AppSession = Session<Producer<SynthMessage>, ClockHandle>;

const MESSAGE_CAPACITY: usize = 256;
const SCOPE_CAPACITY: usize = 4096;
pub const SCOPE_LEN: usize = 1024;
const BEEPER_VOICES: usize = 8;
const MIDI_FILE: &str = "keyroll.mid";
const FRAME_TIME: Duration = Duration::from_millis(33);

/// The master bus setting the arrow keys change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BusControl {
    Volume,
    Drive,
    Eq(EqBand),
}

impl BusControl {
    const ALL: [BusControl; 5] = [
        BusControl::Volume,
        BusControl::Drive,
        BusControl::Eq(EqBand::Low),
        BusControl::Eq(EqBand::Mid),
        BusControl::Eq(EqBand::High),
    ];
}

/// UI-side copy of the master bus settings
#[derive(Debug, Clone)]
pub struct BusControls {
    pub selected: usize,
    pub volume: f32,
    pub drive: f32,
    pub eq: [f32; 3],
}

impl BusControls {
    fn new() -> Self {
        Self {
            selected: 0,
            volume: 1.0,
            drive: 0.0,
            eq: [0.0; 3],
        }
    }

    pub fn selected(&self) -> BusControl {
        BusControl::ALL[self.selected]
    }

    fn next(&mut self) {
        self.selected = (self.selected + 1) % BusControl::ALL.len();
    }

    fn adjust(&mut self, direction: f32) -> BusMessage {
        match self.selected() {
            BusControl::Volume => {
                self.volume = (self.volume + 0.05 * direction).clamp(0.0, 1.0);
                BusMessage::SetVolume(self.volume)
            }
            BusControl::Drive => {
                self.drive = (self.drive + 0.05 * direction).clamp(0.0, 0.95);
                // negative curve values saturate
                BusMessage::SetOverdrive(-self.drive)
            }
            BusControl::Eq(band) => {
                let gain = &mut self.eq[band as usize];
                *gain = (*gain + 1.0 * direction).clamp(-24.0, 24.0);
                BusMessage::SetEqBand {
                    band,
                    gain_db: *gain,
                }
            }
        }
    }
}

pub struct App {
    session: AppSession,
    bus: Producer<BusMessage>,
    /// Reverbs the audio thread has replaced, freed here
    retired: Consumer<Box<Convolver>>,
    scope_rx: Consumer<f32>,
    scope: Vec<f32>,
    controls: BusControls,
    /// Note being edited on the roll; `None` outside edit mode
    selected: Option<EventId>,
    status: String,
    sample_rate: f32,
    reverb: bool,
    key_release: bool,
    should_quit: bool,
    _stream: cpal::Stream,
}

impl App {
    pub fn new(settings: Settings) -> EyreResult<Self> {
        settings.validate().wrap_err("invalid settings")?;

        let (synth_tx, synth_rx) = RingBuffer::<SynthMessage>::new(MESSAGE_CAPACITY);
        let (beeper_tx, beeper_rx) = RingBuffer::<SynthMessage>::new(MESSAGE_CAPACITY);
        let (mut bus_tx, bus_rx) = RingBuffer::<BusMessage>::new(16);
        let (retired_tx, retired_rx) = RingBuffer::<Box<Convolver>>::new(4);
        let (scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;
        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!("audio output: {} Hz, {} channels", sample_rate, channels);

        let mut keys = PolySynth::new(
            VoicePool::with_detune(sample_rate, settings.polyphony, settings.detune),
            synth_rx,
        )
        .bend_range(settings.bend_range);
        keys.pool_mut().set_lfo_frequency(settings.lfo_frequency);
        let beeper = PolySynth::new(VoicePool::new(sample_rate, BEEPER_VOICES), beeper_rx);

        let graph = Mix::with_gains(keys, beeper, 1.0, settings.beep_gain)
            .through(MasterBus::new(sample_rate, bus_rx, retired_tx));
        let stream = start_stream(&device, &config.into(), graph, channels, scope_tx)?;

        let mut reverb = false;
        if let Some(path) = &settings.impulse {
            match ImpulseResponse::load(path, sample_rate as u32) {
                Ok(impulse) => {
                    reverb = bus_tx
                        .push(BusMessage::SetReverb(Some(impulse.convolver())))
                        .is_ok();
                }
                Err(err) => warn!("reverb disabled: {}", err),
            }
        }

        let clock = worker::spawn(
            ClockConfig::new(settings.intervals()?).poll_interval(settings.poll_interval()),
        )
        .wrap_err("cannot start clock thread")?;

        let session = Session::new(&settings, synth_tx, beeper_tx, clock)?;

        Ok(Self {
            session,
            bus: bus_tx,
            retired: retired_rx,
            scope_rx,
            scope: vec![0.0; SCOPE_LEN],
            controls: BusControls::new(),
            selected: None,
            status: String::from("ready"),
            sample_rate,
            reverb,
            key_release: false,
            should_quit: false,
            _stream: stream,
        })
    }

    pub fn session(&self) -> &AppSession {
        &self.session
    }

    pub fn scope(&self) -> &[f32] {
        &self.scope
    }

    pub fn controls(&self) -> &BusControls {
        &self.controls
    }

    pub fn selected(&self) -> Option<EventId> {
        self.selected
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn reverb(&self) -> bool {
        self.reverb
    }

    pub fn key_release(&self) -> bool {
        self.key_release
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        // without release events every key press becomes a timed tap
        self.key_release = supports_keyboard_enhancement().unwrap_or(false);
        if self.key_release {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let result = self.event_loop(terminal);

        if self.key_release {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        self.session.stop(Instant::now());
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        let mut last_draw: Option<Instant> = None;
        while !self.should_quit {
            while let Some(message) = self.session.clock_mut().try_recv() {
                self.session.handle_clock(message);
            }
            self.session.update(Instant::now());
            self.poll_scope();
            while let Ok(reverb) = self.retired.pop() {
                drop(reverb);
            }

            if last_draw.map_or(true, |at| at.elapsed() >= FRAME_TIME) {
                terminal.draw(|frame| ui::draw(frame, self))?;
                last_draw = Some(Instant::now());
            }

            // short poll so scheduled notes stay close to their deadlines
            if event::poll(Duration::from_millis(2))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key, Instant::now());
                }
            }
        }
        Ok(())
    }

    fn poll_scope(&mut self) {
        let available = self.scope_rx.slots();
        if available == 0 {
            return;
        }
        while let Ok(sample) = self.scope_rx.pop() {
            self.scope.push(sample);
        }
        if self.scope.len() > SCOPE_LEN {
            let excess = self.scope.len() - SCOPE_LEN;
            self.scope.drain(0..excess);
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let modified = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);

        match key.kind {
            KeyEventKind::Release => {
                if let KeyCode::Char(c) = key.code {
                    self.session.key_up(c, modified, now);
                }
                return;
            }
            KeyEventKind::Repeat if self.key_release => return,
            _ => {}
        }

        if let Some(id) = self.selected {
            if self.edit_key(id, key.code) {
                return;
            }
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char(' ') => self.session.toggle_play(now),
            KeyCode::F(2) => {
                self.session.record();
            }
            KeyCode::F(3) => {
                self.session.play();
            }
            KeyCode::F(4) => self.session.stop(now),
            KeyCode::F(5) => self.export(),
            KeyCode::F(6) => {
                self.session.toggle_chorus();
                self.status = String::from("chorus toggled");
            }
            KeyCode::F(7) => {
                let muted = self.session.toggle_metronome();
                self.status = format!("metronome {}", if muted { "off" } else { "on" });
            }
            KeyCode::F(8) => {
                let cleared = self.session.clear();
                self.selected = None;
                self.status = format!("cleared {} notes", cleared);
            }
            KeyCode::F(9) => self.import(now),
            KeyCode::F(10) => {
                self.session.pause(now);
                self.selected =
                    ui::step_selection(self.session.recorder().events(), None, true);
                if self.selected.is_none() {
                    self.status = String::from("nothing recorded to edit");
                }
            }
            KeyCode::Up => self.session.nudge_tempo(1.0, now),
            KeyCode::Down => self.session.nudge_tempo(-1.0, now),
            KeyCode::Tab => self.controls.next(),
            KeyCode::Left => self.adjust_bus(-1.0),
            KeyCode::Right => self.adjust_bus(1.0),
            KeyCode::Char(c) => {
                if self.key_release {
                    self.session.key_down(c, modified, now);
                } else {
                    self.session.tap(c, modified, now);
                }
            }
            _ => {}
        }
    }

    /// Keys while a note is selected. Returns false for keys edit mode
    /// leaves to the normal bindings.
    fn edit_key(&mut self, id: EventId, code: KeyCode) -> bool {
        let step = 1.0 / self.session.intervals().divisions() as f64;
        let pitch = self.session.recorder().event(id).map(|e| e.pitch);
        let result = match code {
            KeyCode::F(10) | KeyCode::Esc => {
                self.selected = None;
                return true;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                let forward = code == KeyCode::Tab;
                self.selected =
                    ui::step_selection(self.session.recorder().events(), Some(id), forward);
                return true;
            }
            KeyCode::Left => self.session.move_event(id, -step),
            KeyCode::Right => self.session.move_event(id, step),
            KeyCode::Up => match pitch {
                Some(p) if p < 127 => self.session.set_event_pitch(id, p + 1),
                _ => Ok(()),
            },
            KeyCode::Down => match pitch {
                Some(p) if p > 0 => self.session.set_event_pitch(id, p - 1),
                _ => Ok(()),
            },
            KeyCode::Delete | KeyCode::Backspace => {
                let next = ui::step_selection(self.session.recorder().events(), Some(id), true)
                    .filter(|next| *next != id);
                let removed = self.session.remove_event(id);
                self.selected = next;
                removed
            }
            _ => return false,
        };
        if let Err(err) = result {
            warn!("edit failed: {}", err);
            self.status = format!("edit failed: {}", err);
            self.selected = None;
        }
        true
    }

    fn adjust_bus(&mut self, direction: f32) {
        let message = self.controls.adjust(direction);
        if self.bus.push(message).is_err() {
            warn!("bus queue full, control change dropped");
        }
    }

    fn export(&mut self) {
        let result = self
            .session
            .export_smf()
            .map_err(|err| err.to_string())
            .and_then(|bytes| fs::write(MIDI_FILE, bytes).map_err(|err| err.to_string()));
        self.status = match result {
            Ok(()) => format!("saved {}", MIDI_FILE),
            Err(err) => {
                warn!("export failed: {}", err);
                format!("export failed: {}", err)
            }
        };
    }

    fn import(&mut self, now: Instant) {
        let result = fs::read(MIDI_FILE)
            .map_err(|err| err.to_string())
            .and_then(|bytes| {
                self.session
                    .import_smf(&bytes, now)
                    .map_err(|err| err.to_string())
            });
        // import replaces every event id
        self.selected = None;
        self.status = match result {
            Ok(count) => format!("loaded {} notes from {}", count, MIDI_FILE),
            Err(err) => {
                warn!("import failed: {}", err);
                format!("import failed: {}", err)
            }
        };
    }
}

fn start_stream<G: GraphNode + 'static>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut graph: G,
    channels: usize,
    mut scope_tx: Producer<f32>,
) -> EyreResult<cpal::Stream> {
    let ctx = RenderCtx::bus(config.sample_rate.0 as f32);
    let mut block = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let buffer = &mut block[..frames];
                buffer.fill(0.0);
                graph.render_block(buffer, &ctx);

                // mono to every channel
                let offset = frames_written * channels;
                for (i, &sample) in buffer.iter().enumerate() {
                    let frame = &mut data[offset + i * channels..offset + (i + 1) * channels];
                    frame.fill(sample);
                    let _ = scope_tx.push(sample);
                }

                frames_written += frames;
            }
        },
        |err| warn!("audio stream error: {}", err),
        None,
    )?;

    stream.play()?;
    Ok(stream)
}
