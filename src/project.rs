//! Multi-plan support: discovery and naming of per-project plan files.
//!
//! Each project is a standalone JSON plan stored as `<name>_plan.json` in the
//! gpm directory. This module handles the naming convention, discovery, and
//! picking the most recently touched plan for `gpm ui`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Database;

/// A project plan with its name and database file path.
#[derive(Debug, Clone)]
pub struct Plan {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Plan {
    /// Create a new plan with the given display name.
    pub fn new(display_name: &str, gpm_dir: &Path) -> Self {
        let name = sanitise_plan_name(display_name);
        let file_path = gpm_dir.join(format!("{}_plan.json", name));

        Plan {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Load a plan from an existing database file, if it follows the naming convention.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        let file_name = file_path.file_stem()?.to_str()?;
        let name = file_name.strip_suffix("_plan")?;
        let display_name = name.replace('_', " ");

        Some(Plan {
            name: name.to_string(),
            display_name,
            file_path,
        })
    }

    /// Create the database file for this plan if it doesn't exist.
    pub fn create_if_not_exists(&self) -> std::io::Result<()> {
        if !self.file_path.exists() {
            let db = Database::default();
            db.save(&self.file_path)?;
        }
        Ok(())
    }
}

/// Convert a display name to a safe plan name for file naming.
/// Lowercases and collapses runs of non-alphanumerics to single underscores.
pub fn sanitise_plan_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Discover all existing plans in the gpm directory, sorted by display name.
pub fn discover_plans(gpm_dir: &Path) -> std::io::Result<Vec<Plan>> {
    let mut plans = Vec::new();

    if !gpm_dir.exists() {
        return Ok(plans);
    }

    for entry in fs::read_dir(gpm_dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(plan) = Plan::from_file(path) {
                plans.push(plan);
            }
        }
    }

    plans.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(plans)
}

/// Find the most recently modified plan in the gpm directory.
pub fn get_most_recent_plan(gpm_dir: &Path) -> std::io::Result<Option<Plan>> {
    let plans = discover_plans(gpm_dir)?;

    let mut most_recent: Option<(Plan, std::time::SystemTime)> = None;
    for plan in plans {
        if let Ok(modified) = fs::metadata(&plan.file_path).and_then(|m| m.modified()) {
            let newer = match &most_recent {
                None => true,
                Some((_, current)) => modified > *current,
            };
            if newer {
                most_recent = Some((plan, modified));
            }
        }
    }

    Ok(most_recent.map(|(plan, _)| plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitise_plan_name() {
        assert_eq!(sanitise_plan_name("My Project"), "my_project");
        assert_eq!(sanitise_plan_name("Rollout-Phase_2"), "rollout_phase_2");
        assert_eq!(sanitise_plan_name("Special!@#$%Characters"), "special_characters");
        assert_eq!(sanitise_plan_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitise_plan_name(""), "");
    }

    #[test]
    fn test_plan_file_round_trip() {
        let plan = Plan::new("Office Move", Path::new("/tmp/gpm"));
        assert!(plan.file_path.ends_with("office_move_plan.json"));
        let back = Plan::from_file(plan.file_path.clone()).unwrap();
        assert_eq!(back.name, "office_move");
        assert_eq!(back.display_name, "office move");
    }
}
