//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。
//! 外部（リモートのタスクサービス、時計、ID 採番）へのインターフェースを提供し、
//! 実装の詳細を隠蔽する。
//!
//! # 設計原則
//! - リモートのタスクサービスが source of truth（正本）
//! - クライアントはその写し（authoritative sequence）を楽観的に先行させるだけ

pub mod clock;
pub mod gateway;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::gateway::{GatewayError, TaskGateway};
pub use self::id_generator::{IdGenerator, UlidGenerator};
