//! Order Resolver
//!
//! ドラッグ&ドロップの意図（何を・どのパーティションの・どこへ）から、
//! 新しいフラットな ID 順と、それに伴う completed フラグの変更を計算する。
//!
//! # 学習ポイント
//! - 純粋関数なので同じ入力には必ず同じ出力（楽観的プレビューとテストの再現性）
//! - 古いイベント（参照先が消えている）はエラーにせず末尾追加にフォールバック
//! - 未知の ID は no-op

use crate::domain::{Partition, Task, TaskId};

use super::projector::project;

/// Where the moved record should land inside the target partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReference {
    /// Immediately before this record.
    Before(TaskId),

    /// After the last record of the target partition.
    EndOf,
}

/// Normalized event emitted by the drag layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropIntent {
    pub moved: TaskId,
    pub reference: DropReference,
    pub target: Partition,
}

impl DropIntent {
    pub fn before(moved: TaskId, reference: TaskId, target: Partition) -> Self {
        Self {
            moved,
            reference: DropReference::Before(reference),
            target,
        }
    }

    pub fn end_of(moved: TaskId, target: Partition) -> Self {
        Self {
            moved,
            reference: DropReference::EndOf,
            target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Same partition; only order changes.
    Reorder,

    /// Other partition; order changes and `completed` flips.
    Move,

    /// Moved id is unknown. Nothing to do.
    Noop,
}

/// The `completed` change a move implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionFlip {
    pub id: TaskId,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: ResolutionKind,

    /// Every id of the input, in the new order.
    pub order: Vec<TaskId>,

    /// The optimistic collection: `order` materialized, with `flip` applied.
    pub preview: Vec<Task>,

    pub flip: Option<CompletionFlip>,
}

impl Resolution {
    fn noop(current: &[Task]) -> Self {
        Self {
            kind: ResolutionKind::Noop,
            order: current.iter().map(|t| t.id).collect(),
            preview: current.to_vec(),
            flip: None,
        }
    }

    fn from_preview(kind: ResolutionKind, preview: Vec<Task>, flip: Option<CompletionFlip>) -> Self {
        Self {
            kind,
            order: preview.iter().map(|t| t.id).collect(),
            preview,
            flip,
        }
    }
}

/// Compute the new order for a drop.
///
/// Output keeps each partition contiguous, incomplete first.
pub fn resolve(current: &[Task], intent: &DropIntent) -> Resolution {
    let Some(moving) = current.iter().find(|t| t.id == intent.moved) else {
        tracing::debug!(moved = %intent.moved, "drop for unknown task ignored");
        return Resolution::noop(current);
    };
    let source = Partition::of(moving);
    let parts = project(current);

    let remaining_source: Vec<Task> = parts
        .get(source)
        .iter()
        .filter(|t| t.id != intent.moved)
        .cloned()
        .collect();

    if intent.target == source {
        // 自分自身の上に落とした場合は元の位置のまま
        let reordered = if intent.reference == DropReference::Before(intent.moved) {
            parts.get(source).to_vec()
        } else {
            insert_at_reference(remaining_source, moving.clone(), intent.reference)
        };
        let preview = match source {
            Partition::Incomplete => concat(reordered, parts.completed),
            Partition::Completed => concat(parts.incomplete, reordered),
        };
        return Resolution::from_preview(ResolutionKind::Reorder, preview, None);
    }

    let mut flipped = moving.clone();
    flipped.completed = intent.target.completed_flag();
    let flip = CompletionFlip {
        id: flipped.id,
        completed: flipped.completed,
    };
    let updated_target = insert_at_reference(parts.get(intent.target).to_vec(), flipped, intent.reference);
    let preview = match intent.target {
        Partition::Incomplete => concat(updated_target, remaining_source),
        Partition::Completed => concat(remaining_source, updated_target),
    };
    Resolution::from_preview(ResolutionKind::Move, preview, Some(flip))
}

/// Insert before the reference, or at the end when the reference is missing from `list`.
fn insert_at_reference(mut list: Vec<Task>, task: Task, reference: DropReference) -> Vec<Task> {
    let index = match reference {
        DropReference::Before(id) => list.iter().position(|t| t.id == id),
        DropReference::EndOf => None,
    };
    match index {
        Some(index) => list.insert(index, task),
        None => {
            if let DropReference::Before(id) = reference {
                tracing::debug!(reference = %id, "stale drop reference, appending");
            }
            list.push(task);
        }
    }
    list
}

fn concat(mut head: Vec<Task>, tail: Vec<Task>) -> Vec<Task> {
    head.extend(tail);
    head
}
