//! List filter and view-level sort modes.
//!
//! These mirror the query options of the remote list endpoint. A sort mode is a
//! view concern: it decides how `list` answers, never how the coordinator
//! stores the user's manual order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Done,
    Undone,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "done" => Ok(Self::Done),
            "undone" => Ok(Self::Undone),
            other => Err(format!("unknown status {other:?} (expected all|done|undone)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    PriorityAsc,
    PriorityDesc,
    DueDateAsc,
    DueDateDesc,
    CreatedAsc,
    CreatedDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 6] = [
        SortMode::PriorityDesc,
        SortMode::PriorityAsc,
        SortMode::DueDateDesc,
        SortMode::DueDateAsc,
        SortMode::CreatedDesc,
        SortMode::CreatedAsc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriorityAsc => "priority_asc",
            Self::PriorityDesc => "priority_desc",
            Self::DueDateAsc => "due_date_asc",
            Self::DueDateDesc => "due_date_desc",
            Self::CreatedAsc => "created_asc",
            Self::CreatedDesc => "created_desc",
        }
    }

    /// Compare two tasks under this mode.
    ///
    /// Returns `None` for `CreatedDesc`: the service answers that mode with its
    /// manual order, which only the service knows.
    pub fn compare(self, a: &Task, b: &Task) -> Option<Ordering> {
        let ordering = match self {
            Self::PriorityDesc => b.priority.cmp(&a.priority).then_with(|| b.id.cmp(&a.id)),
            Self::PriorityAsc => a.priority.cmp(&b.priority).then_with(|| b.id.cmp(&a.id)),
            // due_date 未設定は常に末尾
            Self::DueDateAsc => a
                .due_date
                .is_none()
                .cmp(&b.due_date.is_none())
                .then_with(|| a.due_date.cmp(&b.due_date))
                .then_with(|| b.id.cmp(&a.id)),
            Self::DueDateDesc => a
                .due_date
                .is_none()
                .cmp(&b.due_date.is_none())
                .then_with(|| b.due_date.cmp(&a.due_date))
                .then_with(|| b.id.cmp(&a.id)),
            Self::CreatedAsc => a
                .created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id)),
            Self::CreatedDesc => return None,
        };
        Some(ordering)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == trimmed)
            .ok_or_else(|| format!("unknown sort mode {trimmed:?}"))
    }
}

/// Query options for `list`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ListFilter {
    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Blank search/category count as unset.
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            search: clean(self.search),
            status: self.status,
            sort: self.sort,
            category: clean(self.category),
        }
    }

    /// Does `task` pass search, category and status?
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(category) = &self.category {
            let same = task
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        match self.status {
            StatusFilter::All => true,
            StatusFilter::Done => task.completed,
            StatusFilter::Undone => !task.completed,
        }
    }

    /// Is any narrowing option set? A narrowed list is not the full authoritative order.
    pub fn is_narrowing(&self) -> bool {
        self.search.is_some() || self.category.is_some() || self.status != StatusFilter::All
    }
}
