//! Color constants for the terminal user interface.

use ratatui::style::Color;

// These mark schedule states in the task list and form.

/// Used for milestone-pinned endpoints.
pub const MILESTONE_GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for tasks past their end date.
pub const OVERDUE_RED: Color = Color::Rgb(178, 34, 34);
/// Used for completed tasks.
pub const DONE_GREEN: Color = Color::Rgb(0, 110, 0);
/// Used for the locked (derived) duration field.
pub const LOCKED_GREY: Color = Color::Rgb(110, 110, 110);
