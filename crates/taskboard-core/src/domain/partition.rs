//! The two columns of the board.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::task::Task;

/// One of the two groups a task belongs to, decided by `completed` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Incomplete,
    Completed,
}

impl Partition {
    pub fn of(task: &Task) -> Self {
        Self::from_completed(task.completed)
    }

    pub fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Completed
        } else {
            Self::Incomplete
        }
    }

    pub fn completed_flag(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => f.write_str("undone"),
            Self::Completed => f.write_str("done"),
        }
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "undone" | "todo" | "incomplete" => Ok(Self::Incomplete),
            "done" | "completed" => Ok(Self::Completed),
            other => Err(format!("unknown partition {other:?} (expected undone|done)")),
        }
    }
}
