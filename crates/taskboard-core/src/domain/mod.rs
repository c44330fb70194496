//! Domain model (ids, task record, partitions, list filter, errors).
//!
//! 振る舞いを持たない値型だけを置く。状態を持つのは app::coordinator のみ。

pub mod errors;
pub mod filter;
pub mod ids;
pub mod partition;
pub mod task;

pub use self::errors::{ErrorKind, MutationError, ValidationError};
pub use self::filter::{ListFilter, SortMode, StatusFilter};
pub use self::ids::{TaskId, TaskIdParseError};
pub use self::partition::Partition;
pub use self::task::{NewTask, Task, TaskPatch};
