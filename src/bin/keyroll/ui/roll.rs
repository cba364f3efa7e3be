//! Piano roll of the recorded notes with a playhead

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use keyroll::{
    io::keyboard::{key_color, KeyColor},
    recorder::{EventId, NoteEvent},
};

use crate::app::AppSession;

/// Measures visible at once; the view pages as the playhead moves.
const WINDOW_MEASURES: u64 = 4;
const LABEL_WIDTH: u16 = 5;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

fn note_name(pitch: u8) -> String {
    format!("{}{}", NOTE_NAMES[pitch as usize % 12], pitch as i16 / 12 - 1)
}

/// The event after (or before) `selected` in time order, wrapping around.
/// Without a current selection this is the first (or last) event.
pub fn step_selection(
    events: &[NoteEvent],
    selected: Option<EventId>,
    forward: bool,
) -> Option<EventId> {
    let len = events.len();
    let index = match selected.and_then(|id| events.iter().position(|e| e.id == id)) {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None if forward => 0,
        None => len.checked_sub(1)?,
    };
    events.get(index).map(|e| e.id)
}

/// Draw the roll. While a note is selected the view pages to it instead
/// of following the playhead.
pub fn render_roll(
    frame: &mut Frame,
    area: Rect,
    session: &AppSession,
    selected: Option<EventId>,
) {
    if area.height < 2 || area.width < LABEL_WIDTH + 8 {
        return;
    }

    let beats_per_measure = session.intervals().beats_per_measure();
    let events = session.recorder().events();

    let selected = selected.and_then(|id| session.recorder().event(id));
    let focus_measure = match selected {
        Some(event) => event.start.measure,
        None => session.position().map_or(0, |p| p.measure()),
    };
    let first_measure = focus_measure / WINDOW_MEASURES * WINDOW_MEASURES;
    let window_beats = (WINDOW_MEASURES * beats_per_measure as u64) as f64;
    let window_start = (first_measure * beats_per_measure as u64) as f64;

    let width = (area.width - LABEL_WIDTH) as usize;
    let cells_per_beat = width as f64 / window_beats;
    let column = |beats: f64| ((beats - window_start) * cells_per_beat).floor() as isize;

    // pitch range: everything recorded, padded to at least an octave
    let (mut low, mut high) = events.iter().fold((u8::MAX, u8::MIN), |(lo, hi), e| {
        (lo.min(e.pitch), hi.max(e.pitch))
    });
    if low > high {
        low = 60;
        high = 72;
    }
    while high - low < 12 {
        high = high.saturating_add(1).min(127);
        low = low.saturating_sub(1);
    }
    let rows = (area.height - 1) as usize;

    let mut lines = Vec::with_capacity(area.height as usize);

    let mut markers = " ".repeat(LABEL_WIDTH as usize);
    for measure in 0..WINDOW_MEASURES {
        let label = format!("|{}", first_measure + measure + 1);
        let span = (beats_per_measure as f64 * cells_per_beat) as usize;
        markers.push_str(&format!("{:<width$}", label, width = span.max(label.len())));
    }
    lines.push(Line::from(Span::styled(
        markers,
        Style::default().fg(Color::DarkGray),
    )));

    let playhead = session
        .position()
        .map(|p| column(p.measure() as f64 * beats_per_measure as f64 + p.beat() as f64));

    for pitch in (low..=high).rev().take(rows) {
        // (glyph, part of the selected note)
        let mut cells = vec![(' ', false); width];
        for event in events.iter().filter(|e| e.pitch == pitch) {
            let is_selected = selected.is_some_and(|s| s.id == event.id);
            let start = column(event.start.to_beats(beats_per_measure));
            let end = column(event.end(beats_per_measure).to_beats(beats_per_measure)).max(start + 1);
            for c in start.max(0)..end.min(width as isize) {
                let glyph = if c == start { '▐' } else { '█' };
                cells[c as usize] = (glyph, is_selected);
            }
        }

        let label_style = match key_color(pitch) {
            KeyColor::White => Style::default().fg(Color::White),
            KeyColor::Black => Style::default().fg(Color::DarkGray),
        };
        let mut spans = vec![Span::styled(
            format!("{:<width$}", note_name(pitch), width = LABEL_WIDTH as usize),
            label_style,
        )];

        let note_color = if session.is_sounding(pitch) {
            Color::Yellow
        } else {
            Color::Green
        };
        for (c, (cell, is_selected)) in cells.into_iter().enumerate() {
            let style = if playhead == Some(c as isize) {
                Style::default().bg(Color::Red)
            } else if is_selected {
                Style::default().fg(Color::Magenta)
            } else if cell == ' ' {
                Style::default()
            } else {
                Style::default().fg(note_color)
            };
            spans.push(Span::styled(cell.to_string(), style));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyroll::{
        clock::Intervals,
        recorder::{Moment, Recorder},
    };

    #[test]
    fn selection_steps_through_events_in_time_order() {
        let mut recorder = Recorder::new(Intervals::new(120.0, 4, 4).unwrap());
        let late = recorder.record_event(60, 80, Moment::new(1, 0, 0.0));
        let early = recorder.record_event(64, 80, Moment::new(0, 2, 0.0));
        let events = recorder.events();

        assert_eq!(step_selection(events, None, true), Some(early));
        assert_eq!(step_selection(events, None, false), Some(late));
        assert_eq!(step_selection(events, Some(early), true), Some(late));
        assert_eq!(step_selection(events, Some(late), true), Some(early));
        assert_eq!(step_selection(events, Some(early), false), Some(late));
        assert_eq!(step_selection(&[], None, false), None);
    }

    #[test]
    fn names_follow_scientific_pitch() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(21), "A0");
    }
}
