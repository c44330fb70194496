//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryTaskGateway**: 障害注入つきのリモートタスクサービス
//!
//! # 本番用実装
//! HTTP クライアントなどの本番用ゲートウェイは別クレートに置き、
//! `TaskGateway` を実装するだけでよい。

pub mod inmem_gateway;

pub use self::inmem_gateway::{GatewayCall, GatewayOp, InMemoryTaskGateway};
