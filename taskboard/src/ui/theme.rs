//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};
use taskboard_proto::task::WorkflowState;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Connected indicator color.
pub const SUCCESS: Color = Color::Green;

/// Feedback line color.
pub const WARNING: Color = Color::Yellow;

/// Disconnected indicator color.
pub const OFFLINE: Color = Color::DarkGray;

/// Category heading color.
pub const CATEGORY_TITLE: Color = Color::Blue;

/// Notes panel title color.
pub const NOTES_TITLE: Color = Color::Green;

/// Colors for priority labels, lowest first.
pub const PRIORITY_COLORS: [Color; 5] = [
    Color::DarkGray,
    Color::Gray,
    Color::White,
    Color::Yellow,
    Color::LightRed,
];

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (metadata, help).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Selected item style (in lists).
#[must_use]
pub fn selected() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Style for the workflow state column.
#[must_use]
pub fn state(state: WorkflowState) -> Style {
    match state {
        WorkflowState::ToDo => normal(),
        WorkflowState::InProgress => Style::default().fg(Color::LightBlue),
        WorkflowState::Done => Style::default()
            .fg(SUCCESS)
            .add_modifier(Modifier::CROSSED_OUT),
    }
}

/// Style for a priority label.
#[must_use]
pub fn priority(index: usize) -> Style {
    Style::default().fg(PRIORITY_COLORS[index % PRIORITY_COLORS.len()])
}

/// Style for the status bar background (dark background with white foreground).
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Style for panel titles with a given color (bold).
#[must_use]
pub fn panel_title(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}
