//! Master bus panel

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keyroll::effects::EqBand;

use crate::app::{BusControl, BusControls};

pub fn render_bus(frame: &mut Frame, area: Rect, controls: &BusControls, reverb: bool) {
    let block = Block::default().title(" Master ").borders(Borders::ALL);

    let mut rows = vec![
        (BusControl::Volume, format!("Volume  {:>5.0}%", controls.volume * 100.0)),
        (BusControl::Drive, format!("Drive   {:>5.2}", controls.drive)),
    ];
    for band in EqBand::ALL {
        rows.push((
            BusControl::Eq(band),
            format!("{:<7} {:>+5.0} dB", band.label(), controls.eq[band as usize]),
        ));
    }

    let selected = controls.selected();
    let mut lines: Vec<Line> = rows
        .into_iter()
        .map(|(control, text)| {
            let style = if control == selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(text, style))
        })
        .collect();
    lines.push(Line::from(Span::styled(
        if reverb { "Reverb  on" } else { "Reverb  off" },
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
