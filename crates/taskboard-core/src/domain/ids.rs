//! Task identifiers.
//!
//! # 二種類の ID
//! - **Remote**: リモートサービスが採番する ID（正本）。レコードの生存期間中は不変。
//! - **Placeholder**: 楽観的 create の間だけ存在するローカル ID（ULID）。
//!   リモートへは決して送らない。
//!
//! ULID を使うのは、同じミリ秒に複数の create が走っても衝突しないため。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    /// Assigned by the remote service.
    Remote(u64),

    /// Transient id of an optimistic create.
    Placeholder(Ulid),
}

impl TaskId {
    pub fn placeholder(ulid: Ulid) -> Self {
        Self::Placeholder(ulid)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// The remote value, if the id has been confirmed by the service.
    pub fn as_remote(&self) -> Option<u64> {
        match self {
            Self::Remote(value) => Some(*value),
            Self::Placeholder(_) => None,
        }
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self::Remote(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(value) => write!(f, "task-{value}"),
            Self::Placeholder(ulid) => write!(f, "tmp-{ulid}"),
        }
    }
}

/// TaskIdParseError は CLI 入力などから ID を読めなかったときのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task id: {0:?}")]
pub struct TaskIdParseError(pub String);

impl FromStr for TaskId {
    type Err = TaskIdParseError;

    /// `42`, `task-42`, `tmp-<ulid>` を受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(rest) = trimmed.strip_prefix("tmp-") {
            return Ulid::from_string(rest)
                .map(Self::Placeholder)
                .map_err(|_| TaskIdParseError(s.to_string()));
        }
        let digits = trimmed.strip_prefix("task-").unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(Self::Remote)
            .map_err(|_| TaskIdParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("7", TaskId::Remote(7))]
    #[case("task-42", TaskId::Remote(42))]
    #[case("  task-3 ", TaskId::Remote(3))]
    fn parses_remote_ids(#[case] input: &str, #[case] expected: TaskId) {
        assert_eq!(input.parse::<TaskId>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("task-")]
    #[case("abc")]
    #[case("tmp-not-a-ulid")]
    fn rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<TaskId>().is_err());
    }

    #[test]
    fn placeholder_display_roundtrips_through_parse() {
        let id = TaskId::placeholder(Ulid::new());
        assert!(id.to_string().starts_with("tmp-"));
        assert_eq!(id.to_string().parse::<TaskId>().unwrap(), id);
        assert!(id.is_placeholder());
        assert_eq!(id.as_remote(), None);
    }

    #[test]
    fn remote_ids_serialize_as_plain_numbers() {
        // リモートサービスの JSON は数値 ID
        let json = serde_json::to_string(&TaskId::Remote(12)).unwrap();
        assert_eq!(json, "12");
        let back: TaskId = serde_json::from_str("12").unwrap();
        assert_eq!(back, TaskId::Remote(12));
    }
}
