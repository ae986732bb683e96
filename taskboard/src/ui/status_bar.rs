//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::App;

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.input.is_some() {
        "Enter: save note | Esc: cancel"
    } else if app.notes.is_some() {
        "a: add note | n: reload | Esc: close notes"
    } else if app.allowed {
        "↑↓/jk: select | Enter: state | p: priority | m: archive | n: notes | r: refresh | R: reset | q: quit"
    } else {
        "↑↓/jk: select | Enter: state | n: notes | r: refresh | R: reset | q: quit"
    };

    let (dot_color, status_text) = if app.connected {
        (theme::SUCCESS, "Live")
    } else {
        (theme::OFFLINE, "Offline")
    };

    let mut spans = vec![
        Span::styled(concat!("Taskboard v", env!("CARGO_PKG_VERSION")), theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
    ];
    if let Some(message) = app.feedback() {
        spans.push(Span::styled(message.to_string(), theme::normal().fg(theme::WARNING)));
    } else {
        spans.push(Span::styled(help_text, theme::dimmed()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
