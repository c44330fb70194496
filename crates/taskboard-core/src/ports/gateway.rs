//! TaskGateway port - リモートのタスクサービス（正本）
//!
//! HTTP などのトランスポートはこの crate の外側にある。
//! ここではインターフェースだけを定義する。
//!
//! # 実装
//! - **InMemoryTaskGateway**: impls/inmem_gateway.rs（開発・テスト用、障害注入つき）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ListFilter, NewTask, Task, TaskId, TaskPatch};

/// Failure reported by the gateway.
///
/// Timeouts belong to the transport and arrive here as `Unreachable`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("remote unreachable: {message}")]
    Unreachable { message: String },

    #[error("remote rejected request with status {status}")]
    Rejected { status: u16, detail: Option<String> },
}

impl GatewayError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            detail: Some(detail.into()),
        }
    }
}

/// TaskGateway はリモートのタスクサービスへの入口
///
/// # 設計原則
/// - `id` と `created_at` はサービスが決める
/// - `reorder` は渡された順序をそのまま永続化し、その結果のリストを返す
/// - 自動リトライはしない（失敗はそのまま呼び出し側へ）
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Task>, GatewayError>;

    async fn create(&self, payload: &NewTask) -> Result<Task, GatewayError>;

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError>;

    async fn delete(&self, id: TaskId) -> Result<(), GatewayError>;

    async fn reorder(&self, order: &[TaskId]) -> Result<Vec<Task>, GatewayError>;
}

#[async_trait]
impl<G: TaskGateway + ?Sized> TaskGateway for std::sync::Arc<G> {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Task>, GatewayError> {
        (**self).list(filter).await
    }

    async fn create(&self, payload: &NewTask) -> Result<Task, GatewayError> {
        (**self).create(payload).await
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), GatewayError> {
        (**self).delete(id).await
    }

    async fn reorder(&self, order: &[TaskId]) -> Result<Vec<Task>, GatewayError> {
        (**self).reorder(order).await
    }
}
