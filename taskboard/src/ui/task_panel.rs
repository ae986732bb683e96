//! Board rendering: tasks grouped under category headings.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};
use taskboard_proto::task::WorkflowState;

use super::theme;
use crate::app::App;

/// Render the task list.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let mut items = Vec::new();
    let mut highlight = None;
    let mut position = 0;

    for (category, tasks) in app.board.categorized() {
        items.push(ListItem::new(Line::from(Span::styled(
            category.to_string(),
            theme::panel_title(theme::CATEGORY_TITLE),
        ))));
        for task in tasks {
            if position == app.selected {
                highlight = Some(items.len());
            }
            position += 1;

            let checkbox = if task.state == WorkflowState::Done {
                "[✓]"
            } else {
                "[ ]"
            };
            let line = Line::from(vec![
                Span::raw("  "),
                Span::styled(checkbox, theme::state(task.state)),
                Span::raw(" "),
                Span::styled(format!("{:<11}", task.state.label()), theme::state(task.state)),
                Span::styled(format!("{:<9}", task.priority()), theme::priority(task.custom_state)),
                Span::styled(task.description.clone(), theme::normal()),
            ]);
            items.push(ListItem::new(line));
        }
    }

    let title = format!("Tasks ({})", app.board.tasks().len());
    let block = Block::default()
        .title(Span::styled(title, theme::bold()))
        .borders(Borders::ALL)
        .border_style(theme::normal());

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::selected());
    let mut state = ListState::default().with_selected(highlight);
    frame.render_stateful_widget(list, area, &mut state);
}
