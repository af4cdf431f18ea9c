//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers that implement the various
//! subcommands available in the CLI, from basic CRUD operations to schedule
//! edits (each routed through the reconciliation engine) and the TUI.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{Duration, Local, TimeZone, Utc};

use crate::calendar::start_end_of_this_week;
use crate::db::*;
use crate::fields::*;
use crate::project::discover_plans;
use crate::schedule::{reconcile, EditedField, ReconcileInput, ScheduleCodec};
use crate::task::Task;
use crate::tui::run::run_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI interface.
    Ui,

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Project name.
        #[arg(long)]
        project: Option<String>,
        /// Comma-separated tags. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Start date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        start: Option<String>,
        /// Duration in days ("5", "3d", "1w 2d").
        #[arg(long)]
        duration: Option<String>,
        /// End date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        end: Option<String>,
        /// Pin the start date as a milestone.
        #[arg(long)]
        start_milestone: bool,
        /// Pin the end date as a milestone.
        #[arg(long)]
        end_milestone: bool,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Status: open | in-progress | done.
        #[arg(long, value_enum, default_value_t = Status::Open)]
        status: Status,
    },

    /// List tasks with optional filters.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by project.
        #[arg(long)]
        project: Option<String>,
        /// Filter by tag. May be repeated. Accepts comma-separated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Schedule filter: active-today | starts-this-week | overdue | unscheduled.
        #[arg(long, value_enum)]
        schedule: Option<ScheduleFilter>,
        /// Render as a tree across parent-child relationships.
        #[arg(long)]
        tree: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Start)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title to view.
        id: String,
        /// Also print the child subtree.
        #[arg(long)]
        children: bool,
    },

    /// Update an existing task. Schedule edits are reconciled:
    /// setting one of start/duration/end recomputes the under-determined field.
    Update {
        /// Task ID or title to update.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description (empty string clears).
        #[arg(long)]
        desc: Option<String>,
        /// New project (empty string clears).
        #[arg(long)]
        project: Option<String>,
        /// New start date.
        #[arg(long)]
        start: Option<String>,
        /// New duration in days.
        #[arg(long)]
        duration: Option<String>,
        /// New end date.
        #[arg(long)]
        end: Option<String>,
        /// Pin or unpin the start date as a milestone.
        #[arg(long)]
        start_milestone: Option<bool>,
        /// Pin or unpin the end date as a milestone.
        #[arg(long)]
        end_milestone: Option<bool>,
        /// Clear all schedule fields.
        #[arg(long)]
        clear_schedule: bool,
        /// New parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// New status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Tags to add. May be repeated. Accepts comma-separated.
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        /// Tags to remove. May be repeated.
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
        /// Clear the parent reference.
        #[arg(long)]
        clear_parent: bool,
    },

    /// Shift a task's whole span by a number of days (negative shifts back).
    Shift {
        /// Task ID or title to shift.
        id: String,
        /// Day delta, e.g. 3 or -7.
        days: i64,
        /// Also shift all descendant tasks.
        #[arg(long)]
        recurse: bool,
    },

    /// Mark a task done.
    Complete {
        /// Task ID or title.
        id: String,
        /// Also complete all descendants.
        #[arg(long)]
        recurse: bool,
    },

    /// Reopen a completed task.
    Reopen {
        /// Task ID or title.
        id: String,
    },

    /// Delete a task.
    Delete {
        /// Task ID or title.
        id: String,
        /// Also delete all descendants.
        #[arg(long)]
        cascade: bool,
    },

    /// List distinct project names used by tasks.
    Projects,

    /// Export tasks to CSV.
    Export {
        /// Output file path (defaults to tasks.csv).
        #[arg(long)]
        output: Option<String>,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Filter by project.
        #[arg(long)]
        project: Option<String>,
        /// Filter by tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Create a timestamped backup of the plan file.
    Backup {
        /// Back up every plan in the gpm directory.
        #[arg(long)]
        all: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the TUI for a plan file.
pub fn cmd_ui(db_path: &Path) {
    if let Err(e) = run_tui(db_path) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Build the reconciliation input for a task, run the engine for one edited
/// field, and write the reconciled triple back. Returns the duration lock.
pub fn reconcile_task(task: &mut Task, edited: EditedField, codec: &ScheduleCodec) -> bool {
    let input = ReconcileInput {
        start_text: task.start.map(|d| codec.format_date(d)).unwrap_or_default(),
        duration_text: task.duration.map(|n| codec.format_duration(n)).unwrap_or_default(),
        end_text: task.end.map(|d| codec.format_date(d)).unwrap_or_default(),
        start_is_milestone: task.start_is_milestone,
        end_is_milestone: task.end_is_milestone,
        edited,
    };
    let out = reconcile(&input, codec);
    task.start = codec.parse_date(&out.start_text);
    task.end = codec.parse_date(&out.end_text);
    task.duration = if out.duration_text.trim().is_empty() {
        None
    } else {
        Some(codec.parse_duration(&out.duration_text))
    };
    out.duration_locked
}

/// True while a task's duration is derived: both endpoints milestone-pinned
/// and filled, so the duration may not be edited directly.
pub fn duration_is_locked(task: &Task) -> bool {
    task.start_is_milestone
        && task.end_is_milestone
        && task.start.is_some()
        && task.end.is_some()
}

/// Apply a duration edit and reconcile, unless the duration is locked.
/// Returns the lock state reported by the engine on success.
pub fn apply_duration_edit(
    task: &mut Task,
    text: &str,
    codec: &ScheduleCodec,
) -> Result<bool, String> {
    if duration_is_locked(task) {
        return Err("duration is derived and locked: both endpoints are milestones".to_string());
    }
    task.duration = Some(codec.parse_duration(text));
    Ok(reconcile_task(task, EditedField::Duration, codec))
}

/// Add a new task to the database.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    desc: Option<String>,
    project: Option<String>,
    tags: Vec<String>,
    start: Option<String>,
    duration: Option<String>,
    end: Option<String>,
    start_milestone: bool,
    end_milestone: bool,
    parent: Option<String>,
    status: Status,
) {
    let codec = ScheduleCodec::default();
    let now_utc = Utc::now().timestamp();

    let parent_id = parent.map(|p| match resolve_task_identifier(&p, db) {
        Ok(pid) => pid,
        Err(e) => {
            eprintln!("Error resolving parent: {}", e);
            std::process::exit(1);
        }
    });

    let mut task = Task {
        id: db.next_id(),
        title,
        description: desc.filter(|d| !d.is_empty()),
        tags: split_and_normalise_tags(&tags),
        project: project.filter(|p| !p.trim().is_empty()),
        parent: parent_id,
        start: None,
        end: None,
        duration: None,
        start_is_milestone: start_milestone,
        end_is_milestone: end_milestone,
        status,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
    };

    // Apply schedule arguments as a sequence of field edits, reconciling
    // after each one the way the form does on blur.
    for (text, edited) in [
        (&start, EditedField::Start),
        (&duration, EditedField::Duration),
        (&end, EditedField::End),
    ] {
        let Some(text) = text else { continue };
        match edited {
            EditedField::Start => {
                task.start = codec.parse_date(text);
                if task.start.is_none() {
                    eprintln!("Unrecognised start date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
                    std::process::exit(1);
                }
            }
            EditedField::Duration => {
                if let Err(e) = apply_duration_edit(&mut task, text, &codec) {
                    eprintln!("Cannot set duration: {e}.");
                    std::process::exit(1);
                }
                continue;
            }
            EditedField::End => {
                task.end = codec.parse_date(text);
                if task.end.is_none() {
                    eprintln!("Unrecognised end date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
                    std::process::exit(1);
                }
            }
            _ => unreachable!(),
        }
        reconcile_task(&mut task, edited, &codec);
    }
    if start_milestone || end_milestone {
        let edited = if start_milestone {
            EditedField::StartMilestone
        } else {
            EditedField::EndMilestone
        };
        if reconcile_task(&mut task, edited, &codec) {
            println!("Both endpoints are milestones: duration is derived and locked.");
        }
    }

    let id = task.id;
    db.tasks.push(task);
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    let t = db.get(id).unwrap();
    println!(
        "Added task {} ({} -> {}, {})",
        id,
        t.start.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        t.end.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        format_duration_cell(t.duration),
    );
}

/// List tasks, filtered and sorted.
#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    db: &Database,
    all: bool,
    status: Option<Status>,
    project: Option<String>,
    tags: Vec<String>,
    schedule: Option<ScheduleFilter>,
    tree: bool,
    sort: SortKey,
    limit: Option<usize>,
) {
    let tags = split_and_normalise_tags(&tags);
    let today = Local::now().date_naive();
    let (week_start, week_end) = start_end_of_this_week(today);

    let mut filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            if !all && t.status == Status::Done {
                return false;
            }
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            if let Some(ref p) = project {
                if t.project.as_deref() != Some(p.as_str()) {
                    return false;
                }
            }
            if !tags.is_empty() {
                let tagset: BTreeSet<_> = t.tags.iter().cloned().collect();
                for tg in &tags {
                    if !tagset.contains(tg) {
                        return false;
                    }
                }
            }
            if let Some(sf) = schedule {
                match sf {
                    ScheduleFilter::ActiveToday => {
                        if !t.is_active_on(today) {
                            return false;
                        }
                    }
                    ScheduleFilter::StartsThisWeek => {
                        if let Some(s) = t.start {
                            if s < week_start || s > week_end {
                                return false;
                            }
                        } else {
                            return false;
                        }
                    }
                    ScheduleFilter::Overdue => {
                        if let Some(e) = t.end {
                            if e >= today || t.status == Status::Done {
                                return false;
                            }
                        } else {
                            return false;
                        }
                    }
                    ScheduleFilter::Unscheduled => {
                        if t.is_scheduled() {
                            return false;
                        }
                    }
                }
            }
            true
        })
        .collect();

    match sort {
        SortKey::Start => filtered.sort_by_key(|t| (t.start.is_none(), t.start, t.id)),
        SortKey::End => filtered.sort_by_key(|t| (t.end.is_none(), t.end, t.id)),
        SortKey::Id => filtered.sort_by_key(|t| t.id),
    }

    if tree {
        // Reorder depth-first under each root, keeping only filtered tasks.
        let keep: HashSet<u64> = filtered.iter().map(|t| t.id).collect();
        let child_map = build_children_map(&db.tasks);
        let idx = db.index();
        let mut ordered: Vec<&Task> = Vec::new();
        let mut depths: HashMap<u64, usize> = HashMap::new();
        let mut seen: HashSet<u64> = HashSet::new();

        fn walk<'a>(
            id: u64,
            depth: usize,
            db: &'a Database,
            idx: &HashMap<u64, usize>,
            child_map: &BTreeMap<u64, Vec<u64>>,
            keep: &HashSet<u64>,
            seen: &mut HashSet<u64>,
            ordered: &mut Vec<&'a Task>,
            depths: &mut HashMap<u64, usize>,
        ) {
            if !seen.insert(id) {
                return;
            }
            if keep.contains(&id) {
                if let Some(&i) = idx.get(&id) {
                    ordered.push(&db.tasks[i]);
                    depths.insert(id, depth);
                }
            }
            if let Some(children) = child_map.get(&id) {
                for &c in children {
                    walk(c, depth + 1, db, idx, child_map, keep, seen, ordered, depths);
                }
            }
        }

        for t in &filtered {
            if t.parent.map_or(true, |p| !keep.contains(&p)) {
                walk(t.id, 0, db, &idx, &child_map, &keep, &mut seen, &mut ordered, &mut depths);
            }
        }
        filtered = ordered;
        if let Some(n) = limit {
            filtered.truncate(n);
        }
        print_table(&filtered, Some(&depths));
    } else {
        if let Some(n) = limit {
            filtered.truncate(n);
        }
        print_table(&filtered, None);
    }
}

/// View a single task's details.
pub fn cmd_view(db: &Database, id: String, children: bool) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let Some(task) = db.get(task_id).cloned() else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let today = Local::now().date_naive();
    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(task.status));
    println!("Project:      {}", task.project.clone().unwrap_or_else(|| "-".into()));
    println!(
        "Start:        {}{}",
        format_endpoint(task.start, task.start_is_milestone),
        if task.start_is_milestone { " (milestone)" } else { "" }
    );
    println!(
        "End:          {}{}",
        match task.end {
            Some(d) => format!("{} ({})", format_endpoint(task.end, task.end_is_milestone), format_date_relative(Some(d), today)),
            None => "-".into(),
        },
        if task.end_is_milestone { " (milestone)" } else { "" }
    );
    println!("Duration:     {}", format_duration_cell(task.duration));
    println!("Parent:       {}", task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
    println!("Tags:         {}", if task.tags.is_empty() { "-".into() } else { task.tags.join(",") });
    println!("Created UTC:  {}", Utc.timestamp_opt(task.created_at_utc, 0).single().unwrap().to_rfc3339());
    println!("Updated UTC:  {}", Utc.timestamp_opt(task.updated_at_utc, 0).single().unwrap().to_rfc3339());
    println!("Description:\n{}\n", task.description.unwrap_or_else(|| "-".into()));

    if children {
        println!("Children:");
        let child_map = build_children_map(&db.tasks);
        if child_map.contains_key(&task_id) {
            let idx = db.index();
            fn dfs(
                id: u64,
                child_map: &BTreeMap<u64, Vec<u64>>,
                idx: &HashMap<u64, usize>,
                db: &Database,
                depth: usize,
            ) {
                if let Some(children) = child_map.get(&id) {
                    for &c in children {
                        if let Some(&i) = idx.get(&c) {
                            let t = &db.tasks[i];
                            println!(
                                "{}- {} [{}] ({} -> {}) (#{})",
                                "  ".repeat(depth),
                                t.title,
                                format_status(t.status),
                                t.start.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                                t.end.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                                t.id
                            );
                            dfs(c, child_map, idx, db, depth + 1);
                        }
                    }
                }
            }
            dfs(task_id, &child_map, &idx, db, 1);
        } else {
            println!("  -");
        }
    }
}

/// Update an existing task's fields.
///
/// Each provided schedule field is applied as its own edit and reconciled in
/// turn (start, then duration, then end), so the triple stays consistent the
/// same way it does in the form.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    project: Option<String>,
    start: Option<String>,
    duration: Option<String>,
    end: Option<String>,
    start_milestone: Option<bool>,
    end_milestone: Option<bool>,
    clear_schedule: bool,
    parent: Option<String>,
    status: Option<Status>,
    add_tags: Vec<String>,
    rm_tags: Vec<String>,
    clear_parent: bool,
) {
    let codec = ScheduleCodec::default();
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    // Resolve parent if provided
    let parent_id = if let Some(parent_str) = parent {
        match resolve_task_identifier(&parent_str, db) {
            Ok(pid) => Some(pid),
            Err(e) => {
                eprintln!("Error resolving parent: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    // Validate parent won't cause cycles before taking the mutable borrow
    if let Some(pid) = parent_id {
        if pid == task_id {
            eprintln!("Parent cannot equal child.");
            std::process::exit(1);
        }
        // Detect cycle.
        let mut cur = Some(pid);
        let mut hops = 0;
        while let Some(p) = cur {
            if p == task_id {
                eprintln!("Setting parent would create a cycle.");
                std::process::exit(1);
            }
            cur = db.get(p).and_then(|x| x.parent);
            hops += 1;
            if hops > 64 {
                break;
            }
        }
    }

    let mut duration_locked = false;
    {
        let Some(t) = db.get_mut(task_id) else {
            eprintln!("Task {} not found.", task_id);
            std::process::exit(1);
        };
        if let Some(s) = title {
            t.title = s;
        }
        if let Some(d) = desc {
            t.description = if d.is_empty() { None } else { Some(d) };
        }
        if let Some(p) = project {
            t.project = if p.trim().is_empty() { None } else { Some(p.trim().to_string()) };
        }
        if clear_parent {
            t.parent = None;
        }
        if let Some(pid) = parent_id {
            t.parent = Some(pid);
        }
        if let Some(s) = status {
            t.status = s;
        }

        if clear_schedule {
            t.start = None;
            t.end = None;
            t.duration = None;
            t.start_is_milestone = false;
            t.end_is_milestone = false;
        }

        // Schedule edits, one reconciliation per edited field.
        if let Some(s) = start {
            t.start = codec.parse_date(&s);
            if t.start.is_none() {
                eprintln!("Unrecognised start date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
                std::process::exit(1);
            }
            duration_locked = reconcile_task(t, EditedField::Start, &codec);
        }
        if let Some(d) = duration {
            match apply_duration_edit(t, &d, &codec) {
                Ok(locked) => duration_locked = locked,
                Err(e) => {
                    eprintln!("Cannot set duration: {e}. Unpin a milestone first.");
                    std::process::exit(1);
                }
            }
        }
        if let Some(e) = end {
            t.end = codec.parse_date(&e);
            if t.end.is_none() {
                eprintln!("Unrecognised end date. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
                std::process::exit(1);
            }
            duration_locked = reconcile_task(t, EditedField::End, &codec);
        }
        if let Some(pin) = start_milestone {
            t.start_is_milestone = pin;
            duration_locked = reconcile_task(t, EditedField::StartMilestone, &codec);
        }
        if let Some(pin) = end_milestone {
            t.end_is_milestone = pin;
            duration_locked = reconcile_task(t, EditedField::EndMilestone, &codec);
        }

        t.updated_at_utc = Utc::now().timestamp();
    }

    // Tag updates under a fresh borrow.
    let Some(t) = db.get_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let mut add = split_and_normalise_tags(&add_tags);
    let rm = split_and_normalise_tags(&rm_tags).into_iter().collect::<HashSet<_>>();
    if !add.is_empty() || !rm.is_empty() {
        // Merge tags.
        let mut set = t.tags.iter().cloned().collect::<BTreeSet<_>>();
        for a in add.drain(..) {
            set.insert(a);
        }
        for r in rm {
            set.remove(&r);
        }
        t.tags = set.into_iter().collect();
    }

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    let t = db.get(task_id).unwrap();
    println!(
        "Updated task {} ({} -> {}, {})",
        task_id,
        t.start.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        t.end.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        format_duration_cell(t.duration),
    );
    if duration_locked {
        println!("Both endpoints are milestones: duration is derived and locked.");
    }
}

/// Shift a task's span by a whole number of days, preserving its duration.
pub fn cmd_shift(db: &mut Database, db_path: &Path, id: String, days: i64, recurse: bool) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let mut targets: HashSet<u64> = HashSet::new();
    targets.insert(task_id);
    if recurse {
        let child_map = build_children_map(&db.tasks);
        collect_descendants(task_id, &child_map, &mut targets);
    }

    let Some(delta) = Duration::try_days(days) else {
        eprintln!("Day shift {} is out of range.", days);
        std::process::exit(1);
    };

    let now_utc = Utc::now().timestamp();
    let mut shifted = 0usize;
    for t in db.tasks.iter_mut().filter(|t| targets.contains(&t.id)) {
        if !t.is_scheduled() {
            continue;
        }
        // Skip a task whose span would leave the representable date range.
        let (new_start, new_end) = match (
            t.start.map(|d| d.checked_add_signed(delta)),
            t.end.map(|d| d.checked_add_signed(delta)),
        ) {
            (Some(None), _) | (_, Some(None)) => continue,
            (s, e) => (s.flatten(), e.flatten()),
        };
        t.start = new_start;
        t.end = new_end;
        t.updated_at_utc = now_utc;
        shifted += 1;
    }

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Shifted {} task(s) by {}d", shifted, days);
}

/// Mark a task as completed, optionally completing all descendants.
pub fn cmd_complete(db: &mut Database, db_path: &Path, id: String, recurse: bool) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let mut targets: HashSet<u64> = HashSet::new();
    targets.insert(task_id);
    if recurse {
        let child_map = build_children_map(&db.tasks);
        collect_descendants(task_id, &child_map, &mut targets);
    }

    let now_utc = Utc::now().timestamp();
    let mut done = 0usize;
    for t in db.tasks.iter_mut().filter(|t| targets.contains(&t.id)) {
        if t.status != Status::Done {
            t.status = Status::Done;
            t.updated_at_utc = now_utc;
            done += 1;
        }
    }

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Completed {} task(s)", done);
}

/// Reopen a completed task.
pub fn cmd_reopen(db: &mut Database, db_path: &Path, id: String) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let Some(t) = db.get_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    t.status = Status::Open;
    t.updated_at_utc = Utc::now().timestamp();

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Reopened task {}", task_id);
}

/// Delete a task, optionally cascading to descendants.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String, cascade: bool) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let mut ids: HashSet<u64> = HashSet::new();
    ids.insert(task_id);
    if cascade {
        let child_map = build_children_map(&db.tasks);
        collect_descendants(task_id, &child_map, &mut ids);
    }

    let count = ids.len();
    db.remove_ids(&ids);
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Deleted {} task(s)", count);
}

/// List distinct project names used by tasks.
pub fn cmd_projects(db: &Database) {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for t in &db.tasks {
        if let Some(ref p) = t.project {
            names.insert(p);
        }
    }
    if names.is_empty() {
        println!("No projects.");
        return;
    }
    for n in names {
        println!("{}", n);
    }
}

/// Export tasks to CSV with their schedule columns.
pub fn cmd_export(
    db: &Database,
    output: Option<String>,
    all: bool,
    project: Option<String>,
    tag: Option<String>,
) {
    let output_path = output.unwrap_or_else(|| "tasks.csv".to_string());

    let tasks: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| {
            if !all && task.status == Status::Done {
                return false;
            }
            if let Some(ref proj_filter) = project {
                if task.project.as_ref() != Some(proj_filter) {
                    return false;
                }
            }
            if let Some(ref tag_filter) = tag {
                if !task.tags.iter().any(|t| t == tag_filter) {
                    return false;
                }
            }
            true
        })
        .collect();

    let mut csv_content = String::new();
    csv_content.push_str(
        "ID,Title,Status,Project,Tags,Start,End,DurationDays,StartMilestone,EndMilestone,Parent,CreatedUTC,UpdatedUTC,Description\n",
    );

    // Escape CSV fields that contain commas or quotes
    let escape_csv = |s: &str| {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\\\""))
        } else {
            s.to_string()
        }
    };

    let task_count = tasks.len();
    for task in &tasks {
        let project = task.project.as_deref().unwrap_or("-");
        let tags = if task.tags.is_empty() { "-".to_string() } else { task.tags.join(";") };
        let start = task.start.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let end = task.end.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        let duration = task.duration.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        let parent = task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let created = Utc.timestamp_opt(task.created_at_utc, 0).single().unwrap().to_rfc3339();
        let updated = Utc.timestamp_opt(task.updated_at_utc, 0).single().unwrap().to_rfc3339();
        let description = task.description.as_deref().unwrap_or("-");

        csv_content.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            task.id,
            escape_csv(&task.title),
            format_status(task.status),
            escape_csv(project),
            escape_csv(&tags),
            start,
            end,
            duration,
            task.start_is_milestone,
            task.end_is_milestone,
            parent,
            created,
            updated,
            escape_csv(description)
        ));
    }

    match fs::write(&output_path, csv_content) {
        Ok(_) => {
            println!("Exported {} task(s) to {}", task_count, output_path);
        }
        Err(e) => {
            eprintln!("Failed to write CSV file: {}", e);
            std::process::exit(1);
        }
    }
}

/// Create a timestamped backup of the plan file.
pub fn create_backup(db_path: &Path) -> std::io::Result<String> {
    if !db_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Plan file does not exist",
        ));
    }

    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("plan.json");

    let backup_path = backup_dir.join(format!("{}_{}", timestamp, db_filename));
    fs::copy(db_path, &backup_path)?;

    Ok(backup_path.to_string_lossy().to_string())
}

/// Back up one plan, or every plan in the gpm directory with --all.
pub fn cmd_backup(db_path: &Path, all: bool) {
    if all {
        let gpm_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
        cmd_backup_all(gpm_dir);
        return;
    }

    match create_backup(db_path) {
        Ok(backup_path) => {
            println!("Backup created: {}", backup_path);
        }
        Err(e) => {
            eprintln!("Failed to create backup: {}", e);
            std::process::exit(1);
        }
    }
}

/// Backup all plans in the gpm directory.
pub fn cmd_backup_all(gpm_dir: &Path) {
    let plans = discover_plans(gpm_dir).unwrap_or_else(|e| {
        eprintln!("Failed to discover plans: {}", e);
        std::process::exit(1);
    });

    if plans.is_empty() {
        println!("No plans found to backup.");
        return;
    }

    let mut success_count = 0;
    let total_count = plans.len();
    for plan in &plans {
        match create_backup(&plan.file_path) {
            Ok(backup_path) => {
                println!("Backed up {}: {}", plan.display_name, backup_path);
                success_count += 1;
            }
            Err(e) => {
                eprintln!("Failed to backup {}: {}", plan.display_name, e);
            }
        }
    }

    println!(
        "Backup completed: {}/{} plans backed up successfully.",
        success_count, total_count
    );
}

/// Generate shell completions on stdout.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;
    use chrono::NaiveDate;

    fn scheduled_task(start_ms: bool, end_ms: bool) -> Task {
        Task {
            id: 1,
            title: "fit out".into(),
            description: None,
            tags: vec![],
            project: None,
            parent: None,
            start: NaiveDate::from_ymd_opt(2024, 1, 10),
            end: NaiveDate::from_ymd_opt(2024, 1, 14),
            duration: Some(5),
            start_is_milestone: start_ms,
            end_is_milestone: end_ms,
            status: Status::Open,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    #[test]
    fn test_duration_edit_refused_while_locked() {
        let mut task = scheduled_task(true, true);
        assert!(duration_is_locked(&task));
        let codec = ScheduleCodec::default();
        assert!(apply_duration_edit(&mut task, "9", &codec).is_err());
        // The inconsistent triple is never written.
        assert_eq!(task.duration, Some(5));
        assert_eq!(task.start, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(task.end, NaiveDate::from_ymd_opt(2024, 1, 14));
    }

    #[test]
    fn test_duration_edit_applies_when_not_locked() {
        let codec = ScheduleCodec::default();

        // No pins: end is recomputed.
        let mut task = scheduled_task(false, false);
        assert!(!duration_is_locked(&task));
        assert_eq!(apply_duration_edit(&mut task, "3", &codec), Ok(false));
        assert_eq!(task.duration, Some(3));
        assert_eq!(task.end, NaiveDate::from_ymd_opt(2024, 1, 12));

        // Only the end pinned: start moves instead.
        let mut task = scheduled_task(false, true);
        assert_eq!(apply_duration_edit(&mut task, "3", &codec), Ok(false));
        assert_eq!(task.start, NaiveDate::from_ymd_opt(2024, 1, 12));
        assert_eq!(task.end, NaiveDate::from_ymd_opt(2024, 1, 14));
    }

    #[test]
    fn test_lock_requires_both_pins_and_both_dates() {
        assert!(!duration_is_locked(&scheduled_task(true, false)));
        let mut half = scheduled_task(true, true);
        half.end = None;
        assert!(!duration_is_locked(&half));
    }
}
