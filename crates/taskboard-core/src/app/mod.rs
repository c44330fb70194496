//! App - アプリケーション層
//!
//! ports を組み合わせてボードのロジックを実装する。
//!
//! # 主要コンポーネント
//! - **projector**: sequence → 二つのパーティション（純粋関数）
//! - **resolver**: ドロップの意図 → 新しい順序と completed の変更（純粋関数）
//! - **reconcile**: 確定結果のマージと部分 rollback（純粋関数）
//! - **MutationCoordinator**: 状態の所有、楽観的適用、rollback、resync
//! - **BoardBuilder**: コーディネーターの構築とワイヤリング

pub mod builder;
pub mod coordinator;
mod operations;
pub mod projector;
pub mod reconcile;
pub mod resolver;

// 主要な型を再エクスポート
pub use self::builder::BoardBuilder;
pub use self::coordinator::{CoordinatorOptions, MutationCoordinator, MutationKind, Snapshot};
pub use self::projector::{Partitions, project};
pub use self::resolver::{
    CompletionFlip, DropIntent, DropReference, Resolution, ResolutionKind, resolve,
};
