//! Application state and key handling.
//!
//! `App` is synchronous: key handlers mutate the board directly and return an
//! [`Action`] when the main loop has network work to do (publish an event,
//! call the HTTP API).

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskboard_proto::task::{TaskUpdate, WorkflowState};

use crate::board::{Board, StateChange};

/// Work the main loop performs on behalf of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A task moved to the next workflow state: publish and log it.
    StateChanged {
        /// Task id.
        id: String,
        /// The transition.
        change: StateChange,
    },
    /// A task's priority rotated: publish it.
    PriorityChanged(TaskUpdate),
    /// Archive the task on the server.
    Archive(String),
    /// Re-fetch the task list.
    Refresh,
    /// Ask every client to drop its workflow state.
    Reset,
    /// Load a task's notes into the side panel.
    ShowNotes(String),
    /// Submit the notes editor contents for a task.
    AppendNote {
        /// Task id.
        id: String,
        /// Full editor contents: the stored log plus the new text.
        notes: String,
    },
}

/// Notes of one task, as last fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesView {
    /// Task the notes belong to.
    pub id: String,
    /// The log text.
    pub text: String,
}

/// Main application state.
pub struct App {
    /// The merged task list.
    pub board: Board,
    /// Index into [`Board::display_order`].
    pub selected: usize,
    /// Whether this machine passed the server's allow-list check.
    pub allowed: bool,
    /// Whether the live-update channel is up.
    pub connected: bool,
    /// Notes panel contents, if open.
    pub notes: Option<NotesView>,
    /// Text being typed into the notes panel, if editing.
    pub input: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    feedback: Option<(String, Instant)>,
    feedback_ttl: Duration,
}

impl App {
    /// Creates the app around a board.
    #[must_use]
    pub const fn new(board: Board, feedback_ttl: Duration) -> Self {
        Self {
            board,
            selected: 0,
            allowed: false,
            connected: false,
            notes: None,
            input: None,
            should_quit: false,
            feedback: None,
            feedback_ttl,
        }
    }

    /// Id of the highlighted task.
    #[must_use]
    pub fn selected_id(&self) -> Option<String> {
        self.board.display_order().into_iter().nth(self.selected)
    }

    /// Shows a transient message in the feedback line.
    pub fn set_feedback(&mut self, message: impl Into<String>) {
        self.feedback = Some((message.into(), Instant::now()));
    }

    /// The feedback message, unless it has expired.
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        self.feedback_at(Instant::now())
    }

    fn feedback_at(&self, now: Instant) -> Option<&str> {
        self.feedback
            .as_ref()
            .filter(|(_, shown)| now.duration_since(*shown) < self.feedback_ttl)
            .map(|(message, _)| message.as_str())
    }

    /// Keeps the selection inside the list after it shrank.
    pub fn clamp_selection(&mut self) {
        let len = self.board.tasks().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Handles a key press.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }
        if self.input.is_some() {
            return self.handle_input_key(key);
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.notes.take().is_none() {
                    self.should_quit = true;
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_prev();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_next();
                None
            }
            KeyCode::Enter | KeyCode::Char('s') => self.cycle_state(),
            KeyCode::Char('p') => self.rotate_priority(),
            KeyCode::Char('m') => self.archive(),
            KeyCode::Char('n') => self.selected_id().map(Action::ShowNotes),
            KeyCode::Char('a') => {
                if self.notes.is_some() {
                    self.input = Some(String::new());
                } else {
                    self.set_feedback("Open the notes panel with 'n' first.");
                }
                None
            }
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('R') => Some(Action::Reset),
            _ => None,
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<Action> {
        let input = self.input.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.input = None;
                None
            }
            KeyCode::Backspace => {
                input.pop();
                None
            }
            KeyCode::Char(c) => {
                input.push(c);
                None
            }
            KeyCode::Enter => {
                let text = self.input.take().unwrap_or_default();
                let notes = self.notes.as_ref()?;
                if text.trim().is_empty() {
                    return None;
                }
                Some(Action::AppendNote {
                    id: notes.id.clone(),
                    notes: format!("{}{text}", notes.text),
                })
            }
            _ => None,
        }
    }

    fn cycle_state(&mut self) -> Option<Action> {
        let id = self.selected_id()?;
        match self.board.toggle_state(&id) {
            Some(change) => Some(Action::StateChanged { id, change }),
            None => {
                self.set_feedback("Task is done. Archive it with 'm'.");
                None
            }
        }
    }

    fn rotate_priority(&mut self) -> Option<Action> {
        if !self.allowed {
            self.set_feedback("Your IP address is not allowed to change priority.");
            return None;
        }
        let id = self.selected_id()?;
        self.board.rotate_priority(&id).map(Action::PriorityChanged)
    }

    fn archive(&mut self) -> Option<Action> {
        if !self.allowed {
            self.set_feedback("Your IP address is not allowed to move tasks.");
            return None;
        }
        let id = self.selected_id()?;
        let done = self
            .board
            .get(&id)
            .is_some_and(|t| t.state == WorkflowState::Done);
        if done {
            Some(Action::Archive(id))
        } else {
            self.set_feedback("Only done tasks can be archived.");
            None
        }
    }

    const fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn select_next(&mut self) {
        if self.selected + 1 < self.board.tasks().len() {
            self.selected += 1;
        }
    }
}
