//! Errors - エラー型と分類
//!
//! # 分類
//! - Validation: 楽観的適用の前に検出。ミューテーションは始まらない
//! - Conflict: 同じ ID のミューテーションが in-flight
//! - Unreachable: リモートに届かない（タイムアウト含む）→ rollback
//! - Rejected: リモートが失敗ステータスを返した → rollback、理由はそのまま表示
//!
//! ドロップ先が消えていた（stale reference）ケースはエラーにしない。
//! Order Resolver が末尾追加にフォールバックする。

use thiserror::Error;

use super::ids::TaskId;
use crate::ports::GatewayError;

/// Input rejected before anything was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title is {len} characters long (max {max})")]
    TitleTooLong { len: usize, max: usize },

    #[error("priority {0} is outside 1..=10")]
    PriorityOutOfRange(u8),

    #[error("category is {len} characters long (max {max})")]
    CategoryTooLong { len: usize, max: usize },

    #[error("update contains no fields")]
    EmptyPatch,

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("task {0} has not been saved yet")]
    PlaceholderId(TaskId),

    #[error("order must contain at least one task")]
    EmptyOrder,
}

/// ErrorKind は呼び出し側が表示を切り替えるための粗い分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Unreachable,
    Rejected,
}

/// Failure of one mutation. Never fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("another change is still pending for {}", join_ids(.ids))]
    Busy { ids: Vec<TaskId> },

    #[error("could not reach server: {message}")]
    Transport { message: String },

    #[error("rejected by server (status {status}): {}", .detail.as_deref().unwrap_or("Request failed"))]
    Rejected { status: u16, detail: Option<String> },
}

impl MutationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Busy { .. } => ErrorKind::Conflict,
            Self::Transport { .. } => ErrorKind::Unreachable,
            Self::Rejected { .. } => ErrorKind::Rejected,
        }
    }

    /// Text for display.
    ///
    /// Transport failures are generic; a rejection reason is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Busy { .. } => "Please wait for the previous change to finish".to_string(),
            Self::Transport { .. } => "Could not reach server".to_string(),
            Self::Rejected { detail, .. } => detail
                .clone()
                .unwrap_or_else(|| "Request failed".to_string()),
        }
    }

    /// Did this failure roll back an optimistic apply?
    pub fn rolled_back(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Rejected { .. })
    }
}

impl From<GatewayError> for MutationError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unreachable { message } => Self::Transport { message },
            GatewayError::Rejected { status, detail } => Self::Rejected { status, detail },
        }
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
