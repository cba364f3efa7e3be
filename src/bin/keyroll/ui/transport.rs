//! Transport bar: state, tempo, meter, position and output level

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keyroll::engine::Transport;

use crate::app::App;

pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

fn transport_label(transport: Transport) -> (&'static str, Color) {
    match transport {
        Transport::Stopped => ("■ Stopped", Color::DarkGray),
        Transport::Recording => ("● Recording", Color::Red),
        Transport::Paused => ("⏸ Paused", Color::Yellow),
        Transport::Playing => ("▶ Playing", Color::Green),
    }
}

pub fn render_transport(frame: &mut Frame, area: Rect, app: &App, stats: &AudioStats) {
    let session = app.session();
    let block = Block::default().title(" keyroll ").borders(Borders::ALL);

    let (state, color) = transport_label(session.transport());
    let ts = session.time_signature();
    let position = match session.position() {
        Some(position) => format!("Bar {} | Beat {}", position.measure() + 1, position.beat() + 1),
        None => String::from("Bar - | Beat -"),
    };
    let click = if session.metronome().is_muted() {
        "click off"
    } else {
        "click on"
    };
    let input = if app.key_release() { "keys" } else { "taps" };

    let line = Line::from(vec![
        Span::styled(
            format!(" {}  ", state),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("BPM: {:.0}  ", session.intervals().bpm()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{}/{}  ", ts.numerator, ts.denominator),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format!("{}  ", position), Style::default().fg(Color::White)),
        Span::styled(
            format!("Oct {:+}  {}  {}  ", session.keymap().octave(), click, input),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{:.1}kHz  ", app.sample_rate() / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}  ", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(app.status().to_string(), Style::default().fg(Color::Yellow)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
