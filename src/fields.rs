//! Enumerations and field types for task management.
//!
//! Structured data types used to categorise tasks and drive list filtering
//! and sorting over their schedules.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[serde(alias = "Open")]
    Open,
    #[serde(alias = "InProgress")]
    InProgress,
    #[serde(alias = "Done")]
    Done,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Start,
    End,
    Id,
}

/// Filtering options for tasks based on their schedule.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScheduleFilter {
    /// Tasks whose span covers today.
    ActiveToday,
    /// Tasks starting in the current ISO week.
    StartsThisWeek,
    /// Tasks whose end date has passed without completion.
    Overdue,
    /// Tasks with no start and no end.
    Unscheduled,
}
