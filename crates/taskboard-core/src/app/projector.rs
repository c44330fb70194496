//! Partition Projector
//!
//! 一本の authoritative sequence から incomplete / completed の二つの列を導出する。
//! 純粋関数・O(n)・入力は変更しない。描画のたびに呼んでよい。

use serde::Serialize;

use crate::domain::{Partition, Task};

/// The two ordered views rendered side by side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Partitions {
    pub incomplete: Vec<Task>,
    pub completed: Vec<Task>,
}

impl Partitions {
    pub fn get(&self, partition: Partition) -> &[Task] {
        match partition {
            Partition::Incomplete => &self.incomplete,
            Partition::Completed => &self.completed,
        }
    }

    /// Incomplete followed by completed: a flat sequence that projects back to `self`.
    pub fn flatten(self) -> Vec<Task> {
        let mut flat = self.incomplete;
        flat.extend(self.completed);
        flat
    }

    pub fn total(&self) -> usize {
        self.incomplete.len() + self.completed.len()
    }

    pub fn done(&self) -> usize {
        self.completed.len()
    }
}

/// Split `sequence` by `completed`, keeping relative order.
pub fn project(sequence: &[Task]) -> Partitions {
    let (completed, incomplete): (Vec<Task>, Vec<Task>) =
        sequence.iter().cloned().partition(|task| task.completed);
    Partitions {
        incomplete,
        completed,
    }
}
