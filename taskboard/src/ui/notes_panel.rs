//! Notes panel rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::theme;
use crate::app::App;

/// Render the open notes log, with the input line while editing.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let Some(notes) = &app.notes else {
        return;
    };

    let mut lines: Vec<Line> = notes
        .text
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), theme::normal())))
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled("No notes yet.", theme::dimmed())));
    }
    if let Some(input) = &app.input {
        lines.push(Line::from(vec![
            Span::styled("> ", theme::bold()),
            Span::raw(input.clone()),
            Span::styled("▏", theme::bold()),
        ]));
    }

    let block = Block::default()
        .title(Span::styled(
            format!("Notes: {}", notes.id),
            theme::panel_title(theme::NOTES_TITLE),
        ))
        .borders(Borders::ALL)
        .border_style(theme::normal());

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
