//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq)]
pub enum AppState {
    TaskList,
    TaskDetail,
    AddTask,
    EditTask,
    Help,
    Confirm,
}

/// Input mode for text entry fields.
#[derive(Clone, Copy, PartialEq)]
pub enum InputMode {
    None,
    Text,
}
