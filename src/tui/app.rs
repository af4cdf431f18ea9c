//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which manages the TUI state,
//! handles user input, renders the interface, and coordinates between
//! different screens (task list, detail, forms, confirm dialog).

use std::io;
use std::path::Path;

use chrono::{Duration, Local, Utc};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::db::*;
use crate::fields::Status;
use crate::task::Task;
use crate::tui::{
    colors::{DONE_GREEN, LOCKED_GREY, MILESTONE_GOLD, OVERDUE_RED},
    enums::{AppState, InputMode},
    task_form::{
        TaskForm, DESCRIPTION_ORDER, DURATION_ORDER, END_MILESTONE_ORDER, END_ORDER,
        PARENT_ORDER, PROJECT_ORDER, START_MILESTONE_ORDER, START_ORDER, STATUS_ORDER,
        TAGS_ORDER, TITLE_ORDER,
    },
    utils::centered_rect,
};

/// Main application state for the terminal user interface.
///
/// Manages all TUI state including current screen, database operations,
/// task filtering, and user interactions.
pub struct App {
    state: AppState,
    db: Database,
    db_path: std::path::PathBuf,
    task_list_state: TableState,
    filtered_tasks: Vec<u64>,
    selected_task: Option<u64>,
    task_form: TaskForm,
    input_mode: InputMode,
    status_message: String,
    show_completed: bool,
    filter_text: String,
    filter_active: bool,
    confirm_delete: Option<u64>,
}

impl App {
    /// Create a new App instance, loading the database from the specified path.
    pub fn new(db_path: &Path) -> io::Result<Self> {
        let db = Database::load(db_path);

        let mut app = App {
            state: AppState::TaskList,
            db,
            db_path: db_path.to_path_buf(),
            task_list_state: TableState::default(),
            filtered_tasks: Vec::new(),
            selected_task: None,
            task_form: TaskForm::new(),
            input_mode: InputMode::None,
            status_message: String::new(),
            show_completed: false,
            filter_text: String::new(),
            filter_active: false,
            confirm_delete: None,
        };

        app.update_filtered_tasks();
        Ok(app)
    }

    /// Recompute the filtered task list and keep the selection in range.
    fn update_filtered_tasks(&mut self) {
        let needle = self.filter_text.to_lowercase();
        let mut ids: Vec<(Option<chrono::NaiveDate>, u64)> = self
            .db
            .tasks
            .iter()
            .filter(|t| {
                if !self.show_completed && t.status == Status::Done {
                    return false;
                }
                if needle.is_empty() {
                    return true;
                }
                t.title.to_lowercase().contains(&needle)
                    || t.project.as_deref().map_or(false, |p| p.to_lowercase().contains(&needle))
                    || t.tags.iter().any(|tag| tag.contains(&needle))
            })
            .map(|t| (t.start, t.id))
            .collect();
        // Unscheduled tasks sink to the bottom.
        ids.sort_by_key(|&(start, id)| (start.is_none(), start, id));
        self.filtered_tasks = ids.into_iter().map(|(_, id)| id).collect();

        if self.filtered_tasks.is_empty() {
            self.task_list_state.select(None);
        } else {
            let sel = self.task_list_state.selected().unwrap_or(0);
            self.task_list_state.select(Some(sel.min(self.filtered_tasks.len() - 1)));
        }
    }

    fn save_db(&mut self) -> io::Result<()> {
        self.db.save(&self.db_path)
    }

    fn get_selected_task(&self) -> Option<&Task> {
        let idx = self.task_list_state.selected()?;
        let id = *self.filtered_tasks.get(idx)?;
        self.db.get(id)
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    /// Handle input while the task list is showing. Returns true to quit.
    fn handle_task_list_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        // Search entry intercepts everything else.
        if self.filter_active {
            match key {
                KeyCode::Esc => {
                    self.filter_active = false;
                    self.filter_text.clear();
                    self.update_filtered_tasks();
                }
                KeyCode::Enter => {
                    self.filter_active = false;
                }
                KeyCode::Backspace => {
                    self.filter_text.pop();
                    self.update_filtered_tasks();
                }
                KeyCode::Char(c) => {
                    self.filter_text.push(c);
                    self.update_filtered_tasks();
                }
                _ => {}
            }
            return Ok(false);
        }

        match key {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('h') => {
                self.state = AppState::Help;
            }
            KeyCode::Char('/') => {
                self.filter_active = true;
                self.clear_status_message();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let len = self.filtered_tasks.len();
                if len > 0 {
                    let i = self.task_list_state.selected().unwrap_or(0);
                    self.task_list_state.select(Some(if i == 0 { len - 1 } else { i - 1 }));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.filtered_tasks.len();
                if len > 0 {
                    let i = self.task_list_state.selected().unwrap_or(0);
                    self.task_list_state.select(Some((i + 1) % len));
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.get_selected_task().map(|t| t.id) {
                    self.selected_task = Some(id);
                    self.state = AppState::TaskDetail;
                }
            }
            KeyCode::Char('a') => {
                self.task_form = TaskForm::new();
                self.task_form.update_active_field();
                self.input_mode = InputMode::Text;
                self.state = AppState::AddTask;
                self.clear_status_message();
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.get_selected_task().cloned() {
                    self.selected_task = Some(task.id);
                    self.task_form = TaskForm::from_task(&task);
                    self.task_form.update_active_field();
                    self.input_mode = InputMode::Text;
                    self.state = AppState::EditTask;
                    self.clear_status_message();
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.get_selected_task().map(|t| t.id) {
                    self.confirm_delete = Some(id);
                    self.state = AppState::Confirm;
                }
            }
            KeyCode::Char('c') => {
                if let Some(id) = self.get_selected_task().map(|t| t.id) {
                    if let Some(t) = self.db.get_mut(id) {
                        t.status = Status::Done;
                        t.updated_at_utc = Utc::now().timestamp();
                    }
                    self.save_db()?;
                    self.update_filtered_tasks();
                    self.set_status_message("Task completed".to_string());
                }
            }
            KeyCode::Char('o') => {
                if let Some(id) = self.get_selected_task().map(|t| t.id) {
                    if let Some(t) = self.db.get_mut(id) {
                        t.status = Status::Open;
                        t.updated_at_utc = Utc::now().timestamp();
                    }
                    self.save_db()?;
                    self.update_filtered_tasks();
                    self.set_status_message("Task reopened".to_string());
                }
            }
            KeyCode::Char('x') => {
                self.show_completed = !self.show_completed;
                self.update_filtered_tasks();
            }
            // Shift the selected task's whole span by one day.
            KeyCode::Char('+') | KeyCode::Char('>') => self.shift_selected(1)?,
            KeyCode::Char('-') | KeyCode::Char('<') => self.shift_selected(-1)?,
            _ => {}
        }
        Ok(false)
    }

    /// Move both endpoints of the selected task by a day delta.
    fn shift_selected(&mut self, days: i64) -> io::Result<()> {
        if let Some(id) = self.get_selected_task().map(|t| t.id) {
            if let Some(t) = self.db.get_mut(id) {
                if t.is_scheduled() {
                    let delta = Duration::days(days);
                    // Both endpoints move or neither does.
                    let (new_start, new_end) = match (
                        t.start.map(|d| d.checked_add_signed(delta)),
                        t.end.map(|d| d.checked_add_signed(delta)),
                    ) {
                        (Some(None), _) | (_, Some(None)) => return Ok(()),
                        (s, e) => (s.flatten(), e.flatten()),
                    };
                    t.start = new_start;
                    t.end = new_end;
                    t.updated_at_utc = Utc::now().timestamp();
                    self.save_db()?;
                    self.update_filtered_tasks();
                    self.set_status_message(format!("Shifted task {} by {}d", id, days));
                } else {
                    self.set_status_message("Task has no schedule to shift".to_string());
                }
            }
        }
        Ok(())
    }

    fn handle_detail_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.state = AppState::TaskList;
            }
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_task {
                    if let Some(task) = self.db.get(id) {
                        self.task_form = TaskForm::from_task(task);
                        self.task_form.update_active_field();
                        self.input_mode = InputMode::Text;
                        self.state = AppState::EditTask;
                    }
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_input(&mut self, key: KeyCode, _modifiers: KeyModifiers, is_edit: bool) -> io::Result<bool> {
        match key {
            KeyCode::Esc => {
                self.state = AppState::TaskList;
                self.input_mode = InputMode::None;
            }
            KeyCode::Tab | KeyCode::Down => {
                self.task_form.next_field();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.task_form.prev_field();
            }
            KeyCode::Left => {
                self.task_form.handle_left_right(false);
            }
            KeyCode::Right => {
                self.task_form.handle_left_right(true);
            }
            KeyCode::Backspace => {
                self.task_form.handle_backspace();
            }
            KeyCode::Delete => {
                self.task_form.handle_delete();
            }
            KeyCode::Enter => {
                if self.task_form.title.value.trim().is_empty() {
                    self.set_status_message("Title is required".to_string());
                    return Ok(false);
                }

                // Reconcile whatever schedule field was still being edited.
                self.task_form.finish_editing();

                let result = if is_edit {
                    self.update_task()
                } else {
                    self.create_task()
                };

                match result {
                    Ok(_) => {
                        self.state = AppState::TaskList;
                        self.input_mode = InputMode::None;
                        self.update_filtered_tasks();
                        self.set_status_message(
                            if is_edit { "Task updated" } else { "Task created" }.to_string(),
                        );
                    }
                    Err(e) => {
                        self.set_status_message(format!("Error: {}", e));
                    }
                }
            }
            KeyCode::Char(c) => {
                self.task_form.handle_char(c);
            }
            _ => {}
        }
        Ok(false)
    }

    /// Parse the parent field, validating the reference.
    fn parse_parent_field(&self, own_id: u64) -> io::Result<Option<u64>> {
        let raw = self.task_form.parent.value.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<u64>() {
            Ok(pid) => {
                if pid == own_id {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Task cannot be its own parent",
                    ));
                }
                if self.db.get(pid).is_none() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Parent ID {} does not exist", pid),
                    ));
                }
                Ok(Some(pid))
            }
            Err(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Parent must be a task ID",
            )),
        }
    }

    /// Read the form's schedule fields into (start, end, duration).
    fn form_schedule(&self) -> (Option<chrono::NaiveDate>, Option<chrono::NaiveDate>, Option<u32>) {
        let codec = &self.task_form.codec;
        let start = codec.parse_date(&self.task_form.start.value);
        let end = codec.parse_date(&self.task_form.end.value);
        let duration = if self.task_form.duration.value.trim().is_empty() {
            None
        } else {
            Some(codec.parse_duration(&self.task_form.duration.value))
        };
        (start, end, duration)
    }

    /// Create a new task from the current form data.
    fn create_task(&mut self) -> io::Result<()> {
        let now_utc = Utc::now().timestamp();
        let id = self.db.next_id();
        let parent = self.parse_parent_field(id)?;
        let (start, end, duration) = self.form_schedule();

        let tags: Vec<String> = split_and_normalise_tags(&[self.task_form.tags.value.clone()]);
        let project = {
            let p = self.task_form.project.value.trim();
            if p.is_empty() { None } else { Some(p.to_string()) }
        };
        let description = {
            let d = self.task_form.description.value.trim();
            if d.is_empty() { None } else { Some(d.to_string()) }
        };

        self.db.tasks.push(Task {
            id,
            title: self.task_form.title.value.trim().to_string(),
            description,
            tags,
            project,
            parent,
            start,
            end,
            duration,
            start_is_milestone: self.task_form.start_is_milestone,
            end_is_milestone: self.task_form.end_is_milestone,
            status: self.task_form.selected_status(),
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        });
        self.save_db()
    }

    /// Write the form back onto the selected task.
    fn update_task(&mut self) -> io::Result<()> {
        let Some(id) = self.selected_task else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No task selected"));
        };
        let parent = self.parse_parent_field(id)?;
        let (start, end, duration) = self.form_schedule();

        let tags: Vec<String> = split_and_normalise_tags(&[self.task_form.tags.value.clone()]);
        let project = {
            let p = self.task_form.project.value.trim();
            if p.is_empty() { None } else { Some(p.to_string()) }
        };
        let description = {
            let d = self.task_form.description.value.trim();
            if d.is_empty() { None } else { Some(d.to_string()) }
        };
        let title = self.task_form.title.value.trim().to_string();
        let status = self.task_form.selected_status();
        let start_ms = self.task_form.start_is_milestone;
        let end_ms = self.task_form.end_is_milestone;

        let Some(t) = self.db.get_mut(id) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("Task {} not found", id)));
        };
        t.title = title;
        t.description = description;
        t.tags = tags;
        t.project = project;
        t.parent = parent;
        t.start = start;
        t.end = end;
        t.duration = duration;
        t.start_is_milestone = start_ms;
        t.end_is_milestone = end_ms;
        t.status = status;
        t.updated_at_utc = Utc::now().timestamp();
        self.save_db()
    }

    fn delete_confirmed_task(&mut self) -> io::Result<()> {
        if let Some(id) = self.confirm_delete.take() {
            let child_map = build_children_map(&self.db.tasks);
            let mut ids = std::collections::HashSet::new();
            ids.insert(id);
            collect_descendants(id, &child_map, &mut ids);
            let count = ids.len();
            self.db.remove_ids(&ids);
            self.save_db()?;
            self.update_filtered_tasks();
            self.set_status_message(format!("Deleted {} task(s)", count));
        }
        Ok(())
    }

    fn handle_confirm_input(&mut self, key: KeyCode) -> io::Result<bool> {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.delete_confirmed_task()?;
                self.state = AppState::TaskList;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_delete = None;
                self.state = AppState::TaskList;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_help_input(&mut self, key: KeyCode) -> io::Result<bool> {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') => {
                self.state = AppState::TaskList;
            }
            _ => {}
        }
        Ok(false)
    }

    /// Render the task list table.
    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let today = Local::now().date_naive();

        let header_cells = ["ID", "Status", "Start", "End", "Dur", "Ends", "Project", "Title"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells)
            .style(Style::default().bg(Color::Blue).fg(Color::White))
            .height(1);

        let rows: Vec<Row> = self
            .filtered_tasks
            .iter()
            .filter_map(|&id| self.db.get(id))
            .map(|task| {
                let tags_str = if task.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", task.tags.join(","))
                };
                let overdue = task.end.map_or(false, |e| e < today) && task.status != Status::Done;

                let style = match task.status {
                    Status::Done => Style::default().fg(Color::DarkGray),
                    _ if overdue => Style::default().fg(OVERDUE_RED),
                    Status::InProgress => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    _ => Style::default().fg(Color::White),
                };

                let start_cell = Cell::from(format_endpoint(task.start, task.start_is_milestone))
                    .style(if task.start_is_milestone {
                        Style::default().fg(MILESTONE_GOLD)
                    } else {
                        Style::default()
                    });
                let end_cell = Cell::from(format_endpoint(task.end, task.end_is_milestone))
                    .style(if task.end_is_milestone {
                        Style::default().fg(MILESTONE_GOLD)
                    } else {
                        Style::default()
                    });

                Row::new(vec![
                    Cell::from(task.id.to_string()),
                    Cell::from(format_status(task.status)),
                    start_cell,
                    end_cell,
                    Cell::from(format_duration_cell(task.duration)),
                    Cell::from(format_date_relative(task.end, today)),
                    Cell::from(task.project.as_deref().unwrap_or("-").to_string()),
                    Cell::from(format!("{}{}", task.title, tags_str)),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(4),  // ID
            Constraint::Length(11), // Status
            Constraint::Length(12), // Start
            Constraint::Length(12), // End
            Constraint::Length(5),  // Dur
            Constraint::Length(10), // Ends
            Constraint::Length(12), // Project
            Constraint::Min(25),    // Title
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.filtered_tasks.len(),
                self.db.tasks.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.task_list_state);
    }

    /// Render the detailed view of a single task.
    fn render_task_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(task) = self.selected_task.and_then(|id| self.db.get(id)) else {
            self.state = AppState::TaskList;
            return;
        };
        let today = Local::now().date_naive();

        let milestone_note = |flag: bool| if flag { "  (milestone)" } else { "" };
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Title:     ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.title.clone()),
            ]),
            Line::from(vec![
                Span::styled("Status:    ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format_status(task.status)),
            ]),
            Line::from(vec![
                Span::styled("Project:   ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.project.clone().unwrap_or_else(|| "-".into())),
            ]),
            Line::from(vec![
                Span::styled("Start:     ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "{}{}",
                    task.start.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                    milestone_note(task.start_is_milestone),
                )),
            ]),
            Line::from(vec![
                Span::styled("End:       ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "{} ({}){}",
                    task.end.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                    format_date_relative(task.end, today),
                    milestone_note(task.end_is_milestone),
                )),
            ]),
            Line::from(vec![
                Span::styled("Duration:  ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format_duration_cell(task.duration)),
            ]),
            Line::from(vec![
                Span::styled("Parent:    ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into())),
            ]),
            Line::from(vec![
                Span::styled("Tags:      ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(if task.tags.is_empty() { "-".into() } else { task.tags.join(",") }),
            ]),
        ];
        if let Some(ref desc) = task.description {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Description:",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for l in desc.lines() {
                lines.push(Line::from(l.to_string()));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "e: edit  Esc: back",
            Style::default().fg(Color::DarkGray),
        )));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(format!("Task #{}", task.id)))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    /// One bordered input box in the form.
    fn form_field(&self, order: usize, title: &str, value: &str) -> Paragraph<'static> {
        let style = if self.task_form.current_field == order {
            Style::default().fg(MILESTONE_GOLD)
        } else {
            Style::default()
        };
        Paragraph::new(value.to_string()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(style),
        )
    }

    /// Render the add/edit task form.
    fn render_task_form(&mut self, f: &mut Frame, area: Rect, is_edit: bool) {
        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
            .split(area);

        let left_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3), // Title
                    Constraint::Length(4), // Description (taller)
                    Constraint::Length(3), // Project
                    Constraint::Length(3), // Tags
                    Constraint::Length(3), // Parent
                    Constraint::Min(1),
                ]
                .as_ref(),
            )
            .split(main_chunks[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3), // Start
                    Constraint::Length(3), // Duration
                    Constraint::Length(3), // End
                    Constraint::Length(3), // Start milestone
                    Constraint::Length(3), // End milestone
                    Constraint::Length(3), // Status
                    Constraint::Min(1),    // Instructions
                ]
                .as_ref(),
            )
            .split(main_chunks[1]);

        // LEFT COLUMN - descriptive fields
        f.render_widget(
            self.form_field(TITLE_ORDER, "Title *", &self.task_form.title.value),
            left_chunks[0],
        );
        let desc = self
            .form_field(DESCRIPTION_ORDER, "Description", &self.task_form.description.value)
            .wrap(Wrap { trim: true });
        f.render_widget(desc, left_chunks[1]);
        f.render_widget(
            self.form_field(PROJECT_ORDER, "Project", &self.task_form.project.value),
            left_chunks[2],
        );
        f.render_widget(
            self.form_field(TAGS_ORDER, "Tags (comma-separated)", &self.task_form.tags.value),
            left_chunks[3],
        );
        f.render_widget(
            self.form_field(PARENT_ORDER, "Parent ID", &self.task_form.parent.value),
            left_chunks[4],
        );

        // RIGHT COLUMN - schedule fields, reconciled on field leave
        f.render_widget(
            self.form_field(START_ORDER, "Start (YYYY-MM-DD)", &self.task_form.start.value),
            right_chunks[0],
        );
        let duration_title = if self.task_form.duration.read_only {
            "Duration (locked by milestones)"
        } else {
            "Duration (days)"
        };
        let duration_style = if self.task_form.duration.read_only {
            Style::default().fg(LOCKED_GREY)
        } else if self.task_form.current_field == DURATION_ORDER {
            Style::default().fg(MILESTONE_GOLD)
        } else {
            Style::default()
        };
        let duration_input = Paragraph::new(self.task_form.duration.value.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(duration_title)
                .border_style(duration_style),
        );
        f.render_widget(duration_input, right_chunks[1]);
        f.render_widget(
            self.form_field(END_ORDER, "End (YYYY-MM-DD)", &self.task_form.end.value),
            right_chunks[2],
        );

        let checkbox = |checked: bool| if checked { "[x]" } else { "[ ]" };
        f.render_widget(
            self.form_field(
                START_MILESTONE_ORDER,
                "Start milestone (space toggles)",
                checkbox(self.task_form.start_is_milestone),
            ),
            right_chunks[3],
        );
        f.render_widget(
            self.form_field(
                END_MILESTONE_ORDER,
                "End milestone (space toggles)",
                checkbox(self.task_form.end_is_milestone),
            ),
            right_chunks[4],
        );
        f.render_widget(
            self.form_field(
                STATUS_ORDER,
                "Status",
                &format!("< {} >", format_status(self.task_form.selected_status())),
            ),
            right_chunks[5],
        );

        let instructions = Paragraph::new(vec![
            Line::from(""),
            Line::from("Tab/Shift+Tab: move between fields"),
            Line::from("Leaving a schedule field reconciles the triple"),
            Line::from("Enter: save   Esc: cancel"),
        ])
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title(if is_edit {
            "Edit Task"
        } else {
            "Add Task"
        }));
        f.render_widget(instructions, right_chunks[6]);
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let text = vec![
            Line::from(Span::styled("Keys", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("  j/k, Up/Down   move selection"),
            Line::from("  Enter          view task details"),
            Line::from("  a              add task"),
            Line::from("  e              edit task"),
            Line::from("  d              delete task (and descendants)"),
            Line::from("  c / o          complete / reopen task"),
            Line::from("  +/- or >/<     shift task span by one day"),
            Line::from("  x              toggle completed tasks"),
            Line::from("  /              filter by title, project, or tag"),
            Line::from("  q              quit"),
            Line::from(""),
            Line::from(Span::styled("Scheduling", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("  A task's start, end, and duration stay consistent:"),
            Line::from("  leaving an edited field recomputes the one that is"),
            Line::from("  under-determined. Milestone endpoints are pinned and"),
            Line::from("  never moved; with both pinned, duration is derived."),
        ];
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(OVERDUE_RED));

        let area = centered_rect(50, 20, area);
        f.render_widget(Clear, area);

        let title = self
            .confirm_delete
            .and_then(|id| self.db.get(id))
            .map(|t| t.title.clone())
            .unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Delete this task and its descendants?",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(title),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];

        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
    }

    /// Render the status bar at the bottom of the screen.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.filter_active {
            format!("Search: {} (Esc to clear, Enter to confirm)", self.filter_text)
        } else if !self.filter_text.is_empty() {
            format!(
                "Tasks: {} (filtered by '{}') | Press 'h' for help",
                self.filtered_tasks.len(),
                self.filter_text
            )
        } else {
            match self.state {
                AppState::TaskList => {
                    format!("Tasks: {} | Press 'h' for help", self.filtered_tasks.len())
                }
                AppState::TaskDetail => "Task Details".to_string(),
                AppState::AddTask => "Add New Task".to_string(),
                AppState::EditTask => "Edit Task".to_string(),
                AppState::Help => "Help".to_string(),
                AppState::Confirm => "Confirm Action".to_string(),
            }
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(DONE_GREEN).fg(Color::White))
            .alignment(Alignment::Left);

        f.render_widget(status, area);
    }

    /// Main render function that dispatches to appropriate view renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
            .split(f.area());

        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[0]),
            AppState::TaskDetail => self.render_task_detail(f, chunks[0]),
            AppState::AddTask => self.render_task_form(f, chunks[0], false),
            AppState::EditTask => self.render_task_form(f, chunks[0], true),
            AppState::Help => self.render_help(f, chunks[0]),
            AppState::Confirm => {
                self.render_task_list(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Dispatch one key event to the current screen. Returns true to quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> io::Result<bool> {
        match self.state {
            AppState::TaskList => self.handle_task_list_input(key, modifiers),
            AppState::TaskDetail => self.handle_detail_input(key, modifiers),
            AppState::AddTask => self.handle_form_input(key, modifiers, false),
            AppState::EditTask => self.handle_form_input(key, modifiers, true),
            AppState::Help => self.handle_help_input(key),
            AppState::Confirm => self.handle_confirm_input(key),
        }
    }

    /// Main event loop for the TUI application.
    ///
    /// Handles rendering and input processing until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        use crossterm::event::{self, Event};

        loop {
            terminal.draw(|f| self.render(f))?;

            if let Event::Key(key) = event::read()? {
                if key.kind == crossterm::event::KeyEventKind::Press
                    && self.handle_key(key.code, key.modifiers)?
                {
                    break;
                }
            }
        }
        Ok(())
    }
}
