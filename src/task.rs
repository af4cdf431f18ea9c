//! Task data structure and related functionality.
//!
//! This module defines the core `Task` struct representing a single work item
//! with its scheduling triple (start, end, duration) and milestone flags,
//! plus hierarchy and categorisation metadata.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::Status;

/// A schedulable work item.
///
/// The scheduling fields mirror a Gantt bar: `start` and `end` bound the bar,
/// `duration` is the inclusive day count between them, and the milestone
/// flags pin an endpoint so reconciliation never moves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub project: Option<String>,
    pub parent: Option<u64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Inclusive day count; consistent with `start`/`end` when all three are set.
    pub duration: Option<u32>,
    #[serde(default)]
    pub start_is_milestone: bool,
    #[serde(default)]
    pub end_is_milestone: bool,
    pub status: Status,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// True when the task has at least one schedule endpoint.
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// True when the span covers the given day.
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(s), Some(e)) => s <= day && day <= e,
            (Some(s), None) => s == day,
            (None, Some(e)) => e == day,
            (None, None) => false,
        }
    }
}
