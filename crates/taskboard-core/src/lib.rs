//! taskboard-core
//!
//! Client-side state engine for a two-column task board backed by a remote task service.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, partition, filter, errors）
//! - **ports**: 抽象化レイヤー（TaskGateway, Clock, IdGenerator）
//! - **app**: ボードのロジック（projector, resolver, reconcile, coordinator, builder）
//! - **impls**: 実装（InMemoryTaskGateway など開発・テスト用）
//! - **config**: 環境変数からの設定
//!
//! # 使用例
//! ```ignore
//! let gateway = InMemoryTaskGateway::default();
//! let board = BoardBuilder::new(gateway).config(&BoardConfig::from_env()?).build();
//! board.refresh().await?;
//! board.create(NewTask::new("write report")).await?;
//! let parts = board.partitions();
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use self::app::{BoardBuilder, MutationCoordinator, Partitions, Snapshot};
pub use self::config::{BoardConfig, ConfigError};
pub use self::domain::{MutationError, NewTask, Task, TaskId, TaskPatch};
