//! Task form handling for the terminal user interface.
//!
//! This module provides the `TaskForm` structure for creating and editing
//! tasks in the TUI, including field ordering and form state management.
//! Leaving one of the schedule fields (or toggling a milestone selector)
//! runs the reconciliation engine and writes the consistent triple back
//! into the field texts, so the form never shows a contradictory schedule.

use crate::{
    fields::Status,
    schedule::{reconcile, EditedField, ReconcileInput, ScheduleCodec},
    task::Task,
    tui::input::InputField,
};

/// Global order constants for task editing view fields.
pub const TITLE_ORDER: usize = 0;
pub const DESCRIPTION_ORDER: usize = 1;
pub const PROJECT_ORDER: usize = 2;
pub const TAGS_ORDER: usize = 3;
pub const PARENT_ORDER: usize = 4;
pub const START_ORDER: usize = 5;
pub const DURATION_ORDER: usize = 6;
pub const END_ORDER: usize = 7;
pub const START_MILESTONE_ORDER: usize = 8;
pub const END_MILESTONE_ORDER: usize = 9;
pub const STATUS_ORDER: usize = 10;

const FIELD_COUNT: usize = 11;

/// Task form for editing fields.
pub struct TaskForm {
    pub title: InputField,
    pub description: InputField,
    pub project: InputField,
    pub tags: InputField,
    pub parent: InputField,
    pub start: InputField,
    pub duration: InputField,
    pub end: InputField,
    pub start_is_milestone: bool,
    pub end_is_milestone: bool,
    pub status: usize,
    pub current_field: usize,
    pub statuses: Vec<Status>,
    pub codec: ScheduleCodec,
}

impl TaskForm {
    /// Create a new empty task form.
    pub fn new() -> Self {
        Self {
            title: InputField::new(),
            description: InputField::new(),
            project: InputField::new(),
            tags: InputField::new(),
            parent: InputField::new(),
            start: InputField::new(),
            duration: InputField::new(),
            end: InputField::new(),
            start_is_milestone: false,
            end_is_milestone: false,
            status: 0, // Open
            current_field: 0,
            statuses: vec![Status::Open, Status::InProgress, Status::Done],
            codec: ScheduleCodec::default(),
        }
    }

    /// Create a task form populated from an existing task.
    pub fn from_task(task: &Task) -> Self {
        let mut form = Self::new();
        form.title = InputField::with_value(&task.title);
        form.description = InputField::with_value(
            &task.description.clone().unwrap_or_default());
        form.project = InputField::with_value(
            &task.project.clone().unwrap_or_default());
        form.tags = InputField::with_value(&task.tags.join(","));
        form.parent = InputField::with_value(
            &task.parent.map(|p| p.to_string()).unwrap_or_default());
        form.start = InputField::with_value(
            &task.start.map(|d| form.codec.format_date(d)).unwrap_or_default());
        form.duration = InputField::with_value(
            &task.duration.map(|n| form.codec.format_duration(n)).unwrap_or_default());
        form.end = InputField::with_value(
            &task.end.map(|d| form.codec.format_date(d)).unwrap_or_default());
        form.start_is_milestone = task.start_is_milestone;
        form.end_is_milestone = task.end_is_milestone;
        form.status = form.statuses.iter().position(|&s| s == task.status).unwrap_or(0);
        // Render the lock state for a task loaded with both endpoints pinned.
        form.reconcile_schedule(EditedField::StartMilestone);
        form
    }

    /// Get mutable references to all input fields in visual order.
    pub fn fields_mut(&mut self) -> Vec<&mut InputField> {
        vec![
            &mut self.title,
            &mut self.description,
            &mut self.project,
            &mut self.tags,
            &mut self.parent,
            &mut self.start,
            &mut self.duration,
            &mut self.end,
            // Milestone and status selectors are not input fields.
        ]
    }

    /// Get the total number of fields (input fields + selectors).
    pub fn field_count(&self) -> usize {
        FIELD_COUNT
    }

    /// The edited-field tag for a schedule field position, if it is one.
    fn schedule_field_at(order: usize) -> Option<EditedField> {
        match order {
            START_ORDER => Some(EditedField::Start),
            DURATION_ORDER => Some(EditedField::Duration),
            END_ORDER => Some(EditedField::End),
            _ => None,
        }
    }

    /// Run the reconciliation engine for one edited schedule field and write
    /// the consistent triple back into the field texts. The duration field
    /// renders read-only while both endpoints are milestone-pinned.
    pub fn reconcile_schedule(&mut self, edited: EditedField) {
        let input = ReconcileInput {
            start_text: self.start.value.clone(),
            duration_text: self.duration.value.clone(),
            end_text: self.end.value.clone(),
            start_is_milestone: self.start_is_milestone,
            end_is_milestone: self.end_is_milestone,
            edited,
        };
        let out = reconcile(&input, &self.codec);
        self.start.set_value(&out.start_text);
        self.duration.set_value(&out.duration_text);
        self.end.set_value(&out.end_text);
        self.duration.read_only = out.duration_locked;
    }

    /// Reconcile on leaving the current field, then run the engine if the
    /// field being left is part of the schedule.
    fn leave_current_field(&mut self) {
        if let Some(edited) = Self::schedule_field_at(self.current_field) {
            self.reconcile_schedule(edited);
        }
    }

    /// Move to the next field in the form.
    pub fn next_field(&mut self) {
        self.leave_current_field();
        self.current_field = (self.current_field + 1) % self.field_count();
        self.update_active_field();
    }

    /// Move to the previous field in the form.
    pub fn prev_field(&mut self) {
        self.leave_current_field();
        self.current_field = if self.current_field == 0 {
            self.field_count() - 1
        } else {
            self.current_field - 1
        };
        self.update_active_field();
    }

    /// Update which field is currently active for editing.
    pub fn update_active_field(&mut self) {
        let current = self.current_field;
        for field in self.fields_mut() {
            field.active = false;
        }

        match current {
            TITLE_ORDER => self.title.active = true,
            DESCRIPTION_ORDER => self.description.active = true,
            PROJECT_ORDER => self.project.active = true,
            TAGS_ORDER => self.tags.active = true,
            PARENT_ORDER => self.parent.active = true,
            START_ORDER => self.start.active = true,
            DURATION_ORDER => self.duration.active = true,
            END_ORDER => self.end.active = true,
            START_MILESTONE_ORDER | END_MILESTONE_ORDER | STATUS_ORDER => {}
            _ => {}
        }
    }

    /// Handle character input for the currently active field.
    pub fn handle_char(&mut self, c: char) {
        match self.current_field {
            TITLE_ORDER => self.title.handle_char(c),
            DESCRIPTION_ORDER => self.description.handle_char(c),
            PROJECT_ORDER => self.project.handle_char(c),
            TAGS_ORDER => self.tags.handle_char(c),
            PARENT_ORDER => self.parent.handle_char(c),
            START_ORDER => self.start.handle_char(c),
            DURATION_ORDER => self.duration.handle_char(c),
            END_ORDER => self.end.handle_char(c),
            START_MILESTONE_ORDER | END_MILESTONE_ORDER => {
                if c == ' ' {
                    self.toggle_milestone(self.current_field == START_MILESTONE_ORDER);
                }
            }
            _ => {}
        }
    }

    /// Handle backspace input for the currently active field.
    pub fn handle_backspace(&mut self) {
        match self.current_field {
            TITLE_ORDER => self.title.handle_backspace(),
            DESCRIPTION_ORDER => self.description.handle_backspace(),
            PROJECT_ORDER => self.project.handle_backspace(),
            TAGS_ORDER => self.tags.handle_backspace(),
            PARENT_ORDER => self.parent.handle_backspace(),
            START_ORDER => self.start.handle_backspace(),
            DURATION_ORDER => self.duration.handle_backspace(),
            END_ORDER => self.end.handle_backspace(),
            _ => {}
        }
    }

    /// Handle delete input for the currently active field.
    pub fn handle_delete(&mut self) {
        match self.current_field {
            TITLE_ORDER => self.title.handle_delete(),
            DESCRIPTION_ORDER => self.description.handle_delete(),
            PROJECT_ORDER => self.project.handle_delete(),
            TAGS_ORDER => self.tags.handle_delete(),
            PARENT_ORDER => self.parent.handle_delete(),
            START_ORDER => self.start.handle_delete(),
            DURATION_ORDER => self.duration.handle_delete(),
            END_ORDER => self.end.handle_delete(),
            _ => {}
        }
    }

    /// Handle left/right arrow keys for cursor movement or selector changes.
    pub fn handle_left_right(&mut self, right: bool) {
        match self.current_field {
            TITLE_ORDER => self.move_cursor(TITLE_ORDER, right),
            DESCRIPTION_ORDER => self.move_cursor(DESCRIPTION_ORDER, right),
            PROJECT_ORDER => self.move_cursor(PROJECT_ORDER, right),
            TAGS_ORDER => self.move_cursor(TAGS_ORDER, right),
            PARENT_ORDER => self.move_cursor(PARENT_ORDER, right),
            START_ORDER => self.move_cursor(START_ORDER, right),
            DURATION_ORDER => self.move_cursor(DURATION_ORDER, right),
            END_ORDER => self.move_cursor(END_ORDER, right),
            START_MILESTONE_ORDER => self.toggle_milestone(true),
            END_MILESTONE_ORDER => self.toggle_milestone(false),
            STATUS_ORDER => {
                if right {
                    self.status = (self.status + 1) % self.statuses.len();
                } else {
                    self.status = if self.status == 0 {
                        self.statuses.len() - 1
                    } else {
                        self.status - 1
                    };
                }
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, order: usize, right: bool) {
        let mut fields = self.fields_mut();
        if right {
            fields[order].move_cursor_right();
        } else {
            fields[order].move_cursor_left();
        }
    }

    /// Flip a milestone flag and run the engine's milestone path, which
    /// decides whether the duration field is locked.
    pub fn toggle_milestone(&mut self, start_side: bool) {
        let edited = if start_side {
            self.start_is_milestone = !self.start_is_milestone;
            EditedField::StartMilestone
        } else {
            self.end_is_milestone = !self.end_is_milestone;
            EditedField::EndMilestone
        };
        self.reconcile_schedule(edited);
    }

    /// Final reconciliation pass for whichever schedule field is still being
    /// edited, used on form submission instead of a field-leave event.
    pub fn finish_editing(&mut self) {
        self.leave_current_field();
    }

    /// The currently selected status value.
    pub fn selected_status(&self) -> Status {
        self.statuses[self.status]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaving_duration_field_recomputes_end() {
        let mut form = TaskForm::new();
        form.start.set_value("2024-01-10");
        form.current_field = DURATION_ORDER;
        form.duration.set_value("5");
        form.next_field();
        assert_eq!(form.end.value, "2024-01-14");
        assert_eq!(form.current_field, END_ORDER);
    }

    #[test]
    fn test_leaving_end_field_recomputes_duration() {
        let mut form = TaskForm::new();
        form.start.set_value("2024-01-10");
        form.current_field = END_ORDER;
        form.end.set_value("2024-01-14");
        form.prev_field();
        assert_eq!(form.duration.value, "5");
    }

    #[test]
    fn test_double_milestone_locks_duration_field() {
        let mut form = TaskForm::new();
        form.start.set_value("2024-01-10");
        form.duration.set_value("5");
        form.end.set_value("2024-01-14");
        form.toggle_milestone(true);
        assert!(!form.duration.read_only);
        form.toggle_milestone(false);
        assert!(form.duration.read_only);
        // Edits are ignored while locked.
        form.current_field = DURATION_ORDER;
        form.handle_char('9');
        assert_eq!(form.duration.value, "5");
        // Unpinning releases the lock.
        form.toggle_milestone(false);
        assert!(!form.duration.read_only);
    }

    #[test]
    fn test_from_task_renders_lock_for_double_milestone() {
        use crate::fields::Status;
        use crate::task::Task;
        let task = Task {
            id: 1,
            title: "launch".into(),
            description: None,
            tags: vec![],
            project: None,
            parent: None,
            start: chrono::NaiveDate::from_ymd_opt(2024, 1, 10),
            end: chrono::NaiveDate::from_ymd_opt(2024, 1, 14),
            duration: Some(5),
            start_is_milestone: true,
            end_is_milestone: true,
            status: Status::Open,
            created_at_utc: 0,
            updated_at_utc: 0,
        };
        let form = TaskForm::from_task(&task);
        assert!(form.duration.read_only);
        assert_eq!(form.duration.value, "5");
    }
}
