//! Keyboard strip: the computer-key range with sounding notes lit

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keyroll::io::keyboard::{is_uncommon, key_color, KeyColor};

use crate::app::AppSession;

/// Lowest and highest key on the unshifted layout
const LOW_KEY: i16 = 48;
const HIGH_KEY: i16 = 79;

pub fn render_keys(frame: &mut Frame, area: Rect, session: &AppSession) {
    let shift = session.keymap().octave() as i16 * 12;
    let block = Block::default()
        .title(format!(" Keys {}..{} ", LOW_KEY + shift, HIGH_KEY + shift))
        .borders(Borders::ALL);

    let mut upper = Vec::new();
    let mut lower = Vec::new();
    for note in (LOW_KEY + shift)..=(HIGH_KEY + shift) {
        let Ok(note) = u8::try_from(note) else {
            continue;
        };
        if note > 127 {
            continue;
        }
        let lit = session.is_sounding(note);
        let (glyph, style) = match (key_color(note), lit) {
            (_, true) => ("█", Style::default().fg(Color::Yellow)),
            (KeyColor::Black, false) => ("▀", Style::default().fg(Color::DarkGray)),
            (KeyColor::White, false) if is_uncommon(note) => {
                ("▄", Style::default().fg(Color::DarkGray))
            }
            (KeyColor::White, false) => ("▄", Style::default().fg(Color::White)),
        };
        upper.push(Span::styled(glyph, style));
        lower.push(Span::styled(
            if note % 12 == 0 { "C" } else { " " },
            Style::default().fg(Color::DarkGray),
        ));
    }

    let lines = vec![Line::from(upper), Line::from(lower)];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
