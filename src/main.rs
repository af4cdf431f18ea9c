//! # GPM - Gantt-style project scheduling CLI
//!
//! A command-line project scheduler with Gantt-style task dates and an
//! optional terminal user interface (TUI).
//!
//! ## Key Features
//!
//! - **Reconciled schedules**: every task carries a (start, end, duration)
//!   triple; editing any one field recomputes the under-determined one so the
//!   triple always stays consistent
//! - **Milestones**: pin a start or end date so reconciliation never moves it;
//!   with both endpoints pinned the duration becomes derived and read-only
//! - **Multiple Interfaces**: full CLI for automation + interactive TUI with a
//!   live-reconciling task form
//! - **Multi-Plan Support**: each project is a local JSON plan file
//! - **Local File Storage**: simple JSON files with CSV export and backups
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch TUI for the most recent plan
//! gpm ui
//!
//! # Add a scheduled task; the end date is computed
//! gpm add "Fit out server room" --start 2024-01-10 --duration 5
//!
//! # Move the end date; the duration is recomputed
//! gpm update 1 --end 2024-01-20
//!
//! # Pin the end as a milestone, then change the duration: start moves instead
//! gpm update 1 --end-milestone true
//! gpm update 1 --duration 3
//!
//! # List tasks
//! gpm list --tree
//! ```
//!
//! Data is stored locally in `~/.gpm` with each plan as a separate JSON file.
//! We recommend you source control this folder via `git init` and back it up
//! periodically.

use std::path::PathBuf;

use clap::Parser;

pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod project;
pub mod schedule;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use db::Database;
use project::{discover_plans, get_most_recent_plan, Plan};

fn main() {
    let cli = Cli::parse();

    // Determine the gpm directory
    let gpm_dir = if let Some(db_path) = cli.db.as_ref() {
        db_path.parent().unwrap_or_else(|| std::path::Path::new(".")).to_path_buf()
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let gpm_dir = PathBuf::from(home).join(".gpm");
        if let Err(e) = std::fs::create_dir_all(&gpm_dir) {
            eprintln!("Failed to create gpm directory {}: {}", gpm_dir.display(), e);
            std::process::exit(1);
        }
        gpm_dir
    };

    // Commands that don't need a loaded database
    match &cli.command {
        Commands::Backup { all: true } => {
            cmd_backup_all(&gpm_dir);
            return;
        }
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Ui => {
            // Open the given plan, or fall back to the most recently touched one.
            if let Some(db_path) = cli.db {
                cmd_ui(&db_path);
            } else {
                match get_most_recent_plan(&gpm_dir) {
                    Ok(Some(plan)) => {
                        println!("Opening recent plan: {}", plan.display_name);
                        cmd_ui(&plan.file_path);
                    }
                    _ => {
                        let default_plan = Plan::new("Default", &gpm_dir);
                        if let Err(e) = default_plan.create_if_not_exists() {
                            eprintln!("Failed to create default plan: {}", e);
                            std::process::exit(1);
                        }
                        cmd_ui(&default_plan.file_path);
                    }
                }
            }
            return;
        }
        _ => {}
    }

    // For all other commands, determine the plan file to use
    let db_path = cli.db.unwrap_or_else(|| {
        match discover_plans(&gpm_dir) {
            Ok(plans) if !plans.is_empty() => plans[0].file_path.clone(),
            _ => {
                // Create a default plan
                let default_plan = Plan::new("Default", &gpm_dir);
                if let Err(e) = default_plan.create_if_not_exists() {
                    eprintln!("Failed to create default plan: {}", e);
                    std::process::exit(1);
                }
                default_plan.file_path
            }
        }
    });

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Ui => unreachable!("UI command handled above"),
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Add {
            title, desc, project, tags, start, duration, end,
            start_milestone, end_milestone, parent, status,
        } => cmd_add(&mut db, &db_path, title, desc, project, tags, start, duration,
                     end, start_milestone, end_milestone, parent, status),

        Commands::List { all, status, project, tags, schedule, tree, sort, limit } =>
            cmd_list(&db, all, status, project, tags, schedule, tree, sort, limit),

        Commands::View { id, children } => cmd_view(&db, id, children),

        Commands::Update { id, title, desc, project, start, duration, end,
                           start_milestone, end_milestone, clear_schedule,
                           parent, status, add_tags, rm_tags, clear_parent } =>
            cmd_update(&mut db, &db_path, id, title, desc, project, start, duration,
                       end, start_milestone, end_milestone, clear_schedule, parent,
                       status, add_tags, rm_tags, clear_parent),

        Commands::Shift { id, days, recurse } => cmd_shift(&mut db, &db_path, id, days, recurse),

        Commands::Complete { id, recurse } => cmd_complete(&mut db, &db_path, id, recurse),

        Commands::Reopen { id } => cmd_reopen(&mut db, &db_path, id),

        Commands::Delete { id, cascade } => cmd_delete(&mut db, &db_path, id, cascade),

        Commands::Projects => cmd_projects(&db),

        Commands::Export { output, all, project, tag } => cmd_export(&db, output, all, project, tag),

        Commands::Backup { all } => cmd_backup(&db_path, all),
    }
}
