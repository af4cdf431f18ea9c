//! Database operations and utility functions for task management.
//!
//! This module provides the `Database` struct for storing and managing tasks,
//! along with utility functions for schedule formatting, table printing, and
//! hierarchical operations.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::fields::Status;
use crate::task::Task;

/// In-memory database for storing and managing tasks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
}

impl Database {
    /// Load database from JSON file, creating a new empty database if file doesn't exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Create an index mapping task IDs to their positions in the tasks vector.
    pub fn index(&self) -> HashMap<u64, usize> {
        let mut m = HashMap::new();
        for (i, t) in self.tasks.iter().enumerate() {
            m.insert(t.id, i);
        }
        m
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Remove all tasks whose IDs are in the given set.
    pub fn remove_ids(&mut self, ids: &HashSet<u64>) {
        self.tasks.retain(|t| !ids.contains(&t.id));
        // Orphaned children keep their parent reference cleared.
        for t in self.tasks.iter_mut() {
            if let Some(p) = t.parent {
                if ids.contains(&p) {
                    t.parent = None;
                }
            }
        }
    }
}

/// Normalize a tag string by trimming, lowercasing, and replacing spaces with hyphens.
pub fn normalise_tag(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated tag strings and normalize each tag.
pub fn split_and_normalise_tags(inputs: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let tag = normalise_tag(part);
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Format a schedule date relative to today ("today", "tomorrow", "in 3d", "2d ago").
pub fn format_date_relative(date: Option<NaiveDate>, today: NaiveDate) -> String {
    match date {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d ago", -delta)
            }
        }
    }
}

/// Format a schedule endpoint for display, marking milestones with a diamond.
pub fn format_endpoint(date: Option<NaiveDate>, milestone: bool) -> String {
    match date {
        None => "-".into(),
        Some(d) => {
            if milestone {
                format!("◆{}", d)
            } else {
                d.to_string()
            }
        }
    }
}

/// Format a duration day count for display.
pub fn format_duration_cell(duration: Option<u32>) -> String {
    match duration {
        None => "-".into(),
        Some(n) => format!("{}d", n),
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Open => "Open",
        Status::InProgress => "InProgress",
        Status::Done => "Done",
    }
}

/// Print tasks in a formatted table with optional tree indentation.
pub fn print_table(tasks: &[&Task], id_to_depth: Option<&HashMap<u64, usize>>) {
    // Header.
    println!(
        "{:<5} {:<11} {:<12} {:<12} {:<5} {:<10} {:<14} {}",
        "ID", "Status", "Start", "End", "Dur", "Ends", "Project", "Title [tags]"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let indent = id_to_depth
            .and_then(|m| m.get(&t.id).copied())
            .unwrap_or(0);
        let indent_str = "  ".repeat(indent);
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.tags.join(","))
        };
        let project = t.project.clone().unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<11} {:<12} {:<12} {:<5} {:<10} {:<14} {}{}{}",
            t.id,
            format_status(t.status),
            format_endpoint(t.start, t.start_is_milestone),
            format_endpoint(t.end, t.end_is_milestone),
            format_duration_cell(t.duration),
            format_date_relative(t.end, today),
            truncate(&project, 14),
            indent_str,
            t.title,
            tags
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Build a map of parent task IDs to their children's IDs.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}

/// Recursively collect all descendant task IDs from a root task.
pub fn collect_descendants(root: u64, child_map: &BTreeMap<u64, Vec<u64>>, out: &mut HashSet<u64>) {
    if let Some(children) = child_map.get(&root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    // Try parsing as ID first
    if let Ok(id) = identifier.parse::<u64>() {
        if db.get(id).is_some() {
            return Ok(id);
        } else {
            return Err(format!("Task with ID {} not found", id));
        }
    }

    // Search by title (case-insensitive)
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with title '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with title '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {}", task.id, task.title));
                if let Some(ref project) = task.project {
                    error_msg.push_str(&format!(" [project: {}]", project));
                }
                error_msg.push('\n');
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_normalise_tags() {
        let tags = split_and_normalise_tags(&["Backend, API".to_string(), "backend".to_string()]);
        assert_eq!(tags, vec!["api".to_string(), "backend".to_string()]);
    }

    #[test]
    fn test_format_date_relative() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(format_date_relative(None, today), "-");
        assert_eq!(format_date_relative(Some(today), today), "today");
        assert_eq!(
            format_date_relative(NaiveDate::from_ymd_opt(2024, 1, 13), today),
            "in 3d"
        );
        assert_eq!(
            format_date_relative(NaiveDate::from_ymd_opt(2024, 1, 8), today),
            "2d ago"
        );
    }

    #[test]
    fn test_remove_ids_clears_orphaned_parents() {
        let mut db = Database::default();
        let now = 0;
        for (id, parent) in [(1, None), (2, Some(1)), (3, Some(2))] {
            db.tasks.push(Task {
                id,
                title: format!("t{id}"),
                description: None,
                tags: vec![],
                project: None,
                parent,
                start: None,
                end: None,
                duration: None,
                start_is_milestone: false,
                end_is_milestone: false,
                status: Status::Open,
                created_at_utc: now,
                updated_at_utc: now,
            });
        }
        let mut ids = HashSet::new();
        ids.insert(2);
        db.remove_ids(&ids);
        assert!(db.get(2).is_none());
        assert_eq!(db.get(3).unwrap().parent, None);
    }
}
