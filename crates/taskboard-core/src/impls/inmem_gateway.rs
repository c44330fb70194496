//! InMemoryTaskGateway - 開発・テスト用のリモートタスクサービス
//!
//! # 学習ポイント
//! - tokio::sync::Mutex で状態を守る（ロックは await をまたがない）
//! - 障害注入: オフライン・一回限りの失敗・レイテンシ
//! - 呼び出しログでテストから「何が送られたか」を確認できる

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{ListFilter, NewTask, Task, TaskId, TaskPatch, ValidationError};
use crate::ports::{Clock, GatewayError, SystemClock, TaskGateway};

/// Which gateway operation a call or an injected fault refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    Create,
    Update,
    Delete,
    Reorder,
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Reorder => "reorder",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for GatewayOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "list" => Ok(Self::List),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "reorder" => Ok(Self::Reorder),
            other => Err(format!(
                "unknown operation {other:?} (expected list|create|update|delete|reorder)"
            )),
        }
    }
}

/// One received call, recorded before faults are evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub op: GatewayOp,
    pub ids: Vec<TaskId>,
}

#[derive(Debug, Clone)]
struct Row {
    task: Task,
    order_index: u64,
}

#[derive(Debug, Default)]
struct GatewayState {
    rows: Vec<Row>,
    next_id: u64,
    offline: bool,
    latency: Duration,
    faults: HashMap<GatewayOp, GatewayError>,
    calls: Vec<GatewayCall>,
}

impl GatewayState {
    fn position(&self, id: TaskId) -> Result<usize, GatewayError> {
        self.rows
            .iter()
            .position(|row| row.task.id == id)
            .ok_or_else(|| GatewayError::rejected(404, "Task not found"))
    }

    fn max_order_index(&self) -> u64 {
        self.rows.iter().map(|row| row.order_index).max().unwrap_or(0)
    }

    fn insert(&mut self, payload: NewTask, now: DateTime<Utc>) -> Task {
        self.next_id += 1;
        let order_index = self.max_order_index() + 1;
        let task = payload.into_placeholder(TaskId::Remote(self.next_id), now);
        self.rows.push(Row {
            task: task.clone(),
            order_index,
        });
        task
    }
}

/// In-memory stand-in for the remote task service.
///
/// # 実装詳細
/// - id は 1 から連番、`created_at` は注入された Clock
/// - 手動順は `order_index`（create は max + 1、reorder は 1.. を振り直す）
/// - `list` は ListFilter を適用し、sort 未指定なら手動順
///
/// # 使用例
/// ```ignore
/// let gateway = InMemoryTaskGateway::with_tasks(clock, vec![NewTask::new("a")]);
/// gateway.fail_next(GatewayOp::Reorder, GatewayError::rejected(500, "boom")).await;
/// ```
pub struct InMemoryTaskGateway {
    state: Mutex<GatewayState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskGateway {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            clock,
        }
    }

    /// Start with `seed` already stored, in the given order.
    ///
    /// Seed payloads are stored as given; invalid ones are skipped with a warning.
    pub fn with_tasks(clock: Arc<dyn Clock>, seed: Vec<NewTask>) -> Self {
        let mut state = GatewayState::default();
        let now = clock.now();
        for payload in seed {
            match payload.validate() {
                Ok(payload) => {
                    state.insert(payload, now);
                }
                Err(err) => tracing::warn!(error = %err, "skipping invalid seed task"),
            }
        }
        Self {
            state: Mutex::new(state),
            clock,
        }
    }

    /// Every call fails with `Unreachable` while offline.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Sleep before answering, so calls from the client can overlap.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = latency;
    }

    /// Fail the next call of `op` with `error`. One-shot.
    pub async fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.state.lock().await.faults.insert(op, error);
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().await.calls.clone()
    }

    /// Server-side view in manual order.
    pub async fn stored(&self) -> Vec<Task> {
        let state = self.state.lock().await;
        manual_order(&state.rows)
    }

    /// Record the call, wait out the latency, then apply injected faults.
    async fn enter(&self, op: GatewayOp, ids: Vec<TaskId>) -> Result<(), GatewayError> {
        let latency = {
            let mut state = self.state.lock().await;
            state.calls.push(GatewayCall { op, ids });
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        if state.offline {
            return Err(GatewayError::unreachable("connection refused"));
        }
        if let Some(error) = state.faults.remove(&op) {
            tracing::debug!(%op, %error, "injected gateway failure");
            return Err(error);
        }
        Ok(())
    }
}

impl Default for InMemoryTaskGateway {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl TaskGateway for InMemoryTaskGateway {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Task>, GatewayError> {
        self.enter(GatewayOp::List, Vec::new()).await?;

        let filter = filter.clone().normalized();
        let state = self.state.lock().await;
        let mut tasks: Vec<Task> = manual_order(&state.rows)
            .into_iter()
            .filter(|task| filter.matches(task))
            .collect();
        if let Some(sort) = filter.sort {
            // CreatedDesc は compare が None を返す。安定ソートなので手動順のまま残る
            tasks.sort_by(|a, b| sort.compare(a, b).unwrap_or(Ordering::Equal));
        }
        Ok(tasks)
    }

    async fn create(&self, payload: &NewTask) -> Result<Task, GatewayError> {
        self.enter(GatewayOp::Create, Vec::new()).await?;

        let payload = payload.clone().validate().map_err(unprocessable)?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        Ok(state.insert(payload, now))
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, GatewayError> {
        self.enter(GatewayOp::Update, vec![id]).await?;

        let mut state = self.state.lock().await;
        let index = state.position(id)?;
        let patch = patch.clone().validate().map_err(unprocessable)?;
        let row = &mut state.rows[index];
        row.task = patch.apply_to(&row.task);
        Ok(row.task.clone())
    }

    async fn delete(&self, id: TaskId) -> Result<(), GatewayError> {
        self.enter(GatewayOp::Delete, vec![id]).await?;

        let mut state = self.state.lock().await;
        let index = state.position(id)?;
        state.rows.remove(index);
        Ok(())
    }

    async fn reorder(&self, order: &[TaskId]) -> Result<Vec<Task>, GatewayError> {
        self.enter(GatewayOp::Reorder, order.to_vec()).await?;

        if let Some(id) = order.iter().find(|id| id.is_placeholder()) {
            return Err(unprocessable(ValidationError::PlaceholderId(*id)));
        }

        let mut state = self.state.lock().await;
        let mut reordered = Vec::with_capacity(order.len());
        let mut next_index = 1;
        for id in order {
            // 未知の ID は無視
            if let Some(row) = state.rows.iter_mut().find(|row| row.task.id == *id) {
                row.order_index = next_index;
                next_index += 1;
                reordered.push(row.task.clone());
            }
        }
        Ok(reordered)
    }
}

/// order_index 昇順、同値なら新しいものが先
fn manual_order(rows: &[Row]) -> Vec<Task> {
    let mut rows: Vec<&Row> = rows.iter().collect();
    rows.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| b.task.created_at.cmp(&a.task.created_at))
            .then_with(|| b.task.id.cmp(&a.task.id))
    });
    rows.into_iter().map(|row| row.task.clone()).collect()
}

fn unprocessable(err: ValidationError) -> GatewayError {
    GatewayError::rejected(422, err.to_string())
}
