use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::color::Color;

/// Stable task identity, allocated by the store. Survives reordering and is
/// what undo records refer to when indexes would be ambiguous.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(pub u64);

/// A row in the plan: one task, possibly a parent of the subtasks that
/// immediately follow it in the store's flat sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Working days between start and end, inclusive of both endpoints.
    pub duration: i64,
    /// Percentage 0–100.
    pub dedication: u8,
    pub color: Color,
    /// Plain-text rendering of the notes.
    pub notes: String,
    /// Rich-text (HTML) notes as edited.
    pub notes_rich: String,
    /// Label → path, in insertion order.
    pub file_links: IndexMap<String, String>,
    pub is_subtask: bool,
    /// Identity of the owning parent. Never traversed for ownership; the
    /// store's contiguity invariant is what actually ties a run together.
    pub parent: Option<TaskId>,
    /// Only observable on tasks that have subtasks.
    pub collapsed: bool,
}

impl Task {
    /// Create a top-level task. `duration` starts at 1; the store's schedule
    /// setters keep it in sync with the dates from then on.
    pub fn new(id: TaskId, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Task {
            id,
            name: name.into(),
            start_date: start,
            end_date: end.max(start),
            duration: 1,
            dedication: 100,
            color: Color::default(),
            notes: String::new(),
            notes_rich: String::new(),
            file_links: IndexMap::new(),
            is_subtask: false,
            parent: None,
            collapsed: false,
        }
    }

    /// Whether any part of the task bar falls inside `[min, max]`.
    pub fn overlaps(&self, min: NaiveDate, max: NaiveDate) -> bool {
        self.start_date <= max && self.end_date >= min
    }
}
