//! Terminal UI for keyroll
//!
//! Draws the transport bar, the piano roll of recorded notes, the keyboard
//! strip and the output scope from the current `App` state.

mod bus;
mod keys;
mod roll;
mod transport;
mod waveform;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

use bus::render_bus;
use keys::render_keys;
use roll::render_roll;
pub use roll::step_selection;
use transport::{render_transport, AudioStats};
use waveform::render_waveform;

const HELP: &str = " [Space] Play/Pause  [F2] Rec  [F3] Play  [F4] Stop  [F5] Save  [F9] Load  \
[F6] Chorus  [F7] Click  [F8] Clear  [F10] Edit  [Up/Down] Tempo  [Tab/Left/Right] Bus  [Esc] Quit";

const EDIT_HELP: &str = " EDIT  [Tab/Shift+Tab] Select  [Left/Right] Move  [Up/Down] Pitch  \
[Del] Delete  [F10/Esc] Done";

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport bar
            Constraint::Min(8),    // Piano roll
            Constraint::Length(4), // Keyboard strip
            Constraint::Length(8), // Scope + bus
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    let stats = AudioStats::from_buffer(app.scope());
    render_transport(frame, chunks[0], app, &stats);

    let roll_block = Block::default().title(" Roll ").borders(Borders::ALL);
    let roll_inner = roll_block.inner(chunks[1]);
    frame.render_widget(roll_block, chunks[1]);
    render_roll(frame, roll_inner, app.session(), app.selected());

    render_keys(frame, chunks[2], app.session());

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(28)])
        .split(chunks[3]);
    render_waveform(frame, bottom[0], app.scope());
    render_bus(frame, bottom[1], app.controls(), app.reverb());

    let help = match app.selected() {
        Some(_) => Paragraph::new(EDIT_HELP).style(Style::default().fg(Color::Magenta)),
        None => Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(help, chunks[4]);
}
