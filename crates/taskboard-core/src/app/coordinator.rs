//! Optimistic Mutation Coordinator
//!
//! authoritative sequence を唯一所有し、すべてのミューテーションを
//! 「楽観的適用 → リモート呼び出し → 確定 or rollback → resync」の順で流す。
//!
//! # 学習ポイント
//! - `tokio::sync::watch` を所有セルとして使う（書き込み = 購読者への通知）
//! - in-flight の ID を claim して、同じレコードへの重なりを拒否する
//! - rollback は revision を見て「丸ごと戻す」か「claim した分だけ戻す」かを選ぶ
//! - resync は連番つき。古い結果は捨てる（last-resync-wins）
//! - resync は in-flight のレコードを上書きしない

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::BoardConfig;
use crate::domain::{ListFilter, MutationError, Task, TaskId, ValidationError};
use crate::ports::{Clock, GatewayError, IdGenerator, TaskGateway};

use super::projector::{Partitions, project};
use super::reconcile;

/// What the UI renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,

    /// Bumped on every write to `tasks`.
    pub revision: u64,

    /// Ids claimed by a pending mutation.
    pub in_flight: BTreeSet<TaskId>,

    /// Number of resyncs awaiting an answer.
    pub refreshing: usize,

    pub filter: ListFilter,

    resync_issued: u64,
    resync_applied: u64,
}

impl Snapshot {
    pub fn partitions(&self) -> Partitions {
        project(&self.tasks)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_in_flight(&self, id: TaskId) -> bool {
        self.in_flight.contains(&id)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Toggle,
    Update,
    Delete,
    Reorder,
    Move,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Toggle => "toggle",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Reorder => "reorder",
            Self::Move => "move",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Run a full resync after every settle.
    pub resync_after_settle: bool,

    /// Restore the remote flag when a move's reorder fails after its update succeeded.
    pub compensate_partial_move: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            resync_after_settle: true,
            compensate_partial_move: true,
        }
    }
}

impl From<&BoardConfig> for CoordinatorOptions {
    fn from(config: &BoardConfig) -> Self {
        Self {
            resync_after_settle: config.resync_after_settle,
            compensate_partial_move: config.compensate_partial_move,
        }
    }
}

/// MutationCoordinator はボードの状態とミューテーションを管理
///
/// # 並行性
/// - アプリケーションロジックは単一の論理スレッド。中断点はゲートウェイの await だけ
/// - 別々の ID へのミューテーションは重なってよい
/// - 同じ ID へのミューテーションが重なったら後から来た方を `Busy` で拒否
///
/// 構築は [`BoardBuilder`](super::builder::BoardBuilder) から。
pub struct MutationCoordinator<G> {
    pub(crate) gateway: G,
    state: watch::Sender<Snapshot>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) options: CoordinatorOptions,
}

/// Claimed ids are released when this drops, also when the mutation future is dropped.
struct Claim<'a> {
    state: &'a watch::Sender<Snapshot>,
    ids: Vec<TaskId>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            for id in &self.ids {
                s.in_flight.remove(id);
            }
        });
    }
}

impl<G: TaskGateway> MutationCoordinator<G> {
    pub(crate) fn new(
        gateway: G,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        options: CoordinatorOptions,
        filter: ListFilter,
    ) -> Self {
        let (state, _) = watch::channel(Snapshot {
            filter: filter.normalized(),
            ..Default::default()
        });
        Self {
            gateway,
            state,
            clock,
            ids,
            options,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn options(&self) -> CoordinatorOptions {
        self.options
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn partitions(&self) -> Partitions {
        project(&self.state.borrow().tasks)
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// The record for `id`, if it is saved and currently on the board.
    pub(crate) fn saved(&self, id: TaskId) -> Result<Task, ValidationError> {
        if id.is_placeholder() {
            return Err(ValidationError::PlaceholderId(id));
        }
        let state = self.state.borrow();
        state
            .get(id)
            .cloned()
            .ok_or(ValidationError::UnknownTask(id))
    }

    /// Run one mutation.
    ///
    /// 1. claim `claimed`; overlapping claims fail with `Busy` and nothing is applied
    /// 2. write `compute_optimistic(current)`
    /// 3. await `perform_remote()`
    /// 4. merge `apply_remote(current, &result)` on success, roll back on failure
    /// 5. resync when configured
    ///
    /// No retry.
    pub async fn mutate<R, O, P, Fut, A>(
        &self,
        kind: MutationKind,
        claimed: &[TaskId],
        compute_optimistic: O,
        perform_remote: P,
        apply_remote: A,
    ) -> Result<R, MutationError>
    where
        O: FnOnce(&[Task]) -> Vec<Task>,
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, GatewayError>>,
        A: FnOnce(&[Task], &R) -> Vec<Task>,
    {
        let claim = self.claim(claimed)?;
        let (previous, applied) = self.apply_optimistic(compute_optimistic);
        debug!(%kind, ids = ?claim.ids, revision = applied, "optimistic apply");

        let outcome = match perform_remote().await {
            Ok(value) => {
                let revision = self.write(|current| apply_remote(current, &value));
                debug!(%kind, revision, "confirmed");
                Ok(value)
            }
            Err(err) => {
                let revision = self.rollback(&previous, applied, &claim.ids);
                warn!(%kind, error = %err, revision, "remote call failed, rolled back");
                Err(MutationError::from(err))
            }
        };
        drop(claim);

        if self.options.resync_after_settle {
            if let Err(err) = self.refresh().await {
                warn!(%kind, error = %err, "resync after settle failed");
            }
        }
        outcome
    }

    /// Replace the sequence with the remote list for the current filter.
    ///
    /// Results are applied only if no later-issued resync was applied first.
    /// Records claimed by a pending mutation keep their optimistic state.
    pub async fn refresh(&self) -> Result<(), MutationError> {
        let mut seq = 0;
        let mut filter = ListFilter::default();
        self.state.send_modify(|s| {
            s.resync_issued += 1;
            s.refreshing += 1;
            seq = s.resync_issued;
            filter = s.filter.clone();
        });

        let result = self.gateway.list(&filter).await;

        let mut applied = false;
        self.state.send_modify(|s| {
            s.refreshing = s.refreshing.saturating_sub(1);
            if let Ok(tasks) = &result {
                if seq > s.resync_applied {
                    // 確定前のミューテーションの楽観的な値は残す
                    s.tasks = reconcile::overlay_in_flight(&s.tasks, tasks, &s.in_flight);
                    s.revision += 1;
                    s.resync_applied = seq;
                    applied = true;
                }
            }
        });

        match result {
            Ok(tasks) if applied => {
                info!(seq, count = tasks.len(), "resync applied");
                Ok(())
            }
            Ok(_) => {
                debug!(seq, "stale resync discarded");
                Ok(())
            }
            Err(err) => {
                debug!(seq, error = %err, "resync failed");
                Err(err.into())
            }
        }
    }

    /// Change the list filter and resync with it.
    pub async fn set_filter(&self, filter: ListFilter) -> Result<(), MutationError> {
        let filter = filter.normalized();
        debug!(?filter, "filter changed");
        self.state.send_modify(|s| s.filter = filter);
        self.refresh().await
    }

    fn claim(&self, ids: &[TaskId]) -> Result<Claim<'_>, MutationError> {
        let ids: Vec<TaskId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut busy = Vec::new();
        // claim だけでは購読者に通知しない
        self.state.send_if_modified(|s| {
            busy = ids.iter().filter(|id| s.in_flight.contains(id)).copied().collect();
            if busy.is_empty() {
                s.in_flight.extend(ids.iter().copied());
            }
            false
        });
        if !busy.is_empty() {
            debug!(?busy, "mutation rejected, ids in flight");
            return Err(MutationError::Busy { ids: busy });
        }
        Ok(Claim {
            state: &self.state,
            ids,
        })
    }

    fn write(&self, f: impl FnOnce(&[Task]) -> Vec<Task>) -> u64 {
        let mut revision = 0;
        self.state.send_modify(|s| {
            s.tasks = f(&s.tasks);
            s.revision += 1;
            revision = s.revision;
        });
        revision
    }

    fn apply_optimistic(&self, f: impl FnOnce(&[Task]) -> Vec<Task>) -> (Vec<Task>, u64) {
        let mut previous = Vec::new();
        let revision = self.write(|current| {
            previous = current.to_vec();
            f(current)
        });
        (previous, revision)
    }

    fn rollback(&self, previous: &[Task], applied: u64, claimed: &[TaskId]) -> u64 {
        let mut revision = 0;
        self.state.send_modify(|s| {
            s.tasks = if s.revision == applied {
                previous.to_vec()
            } else {
                reconcile::restore_claimed(&s.tasks, previous, claimed)
            };
            s.revision += 1;
            revision = s.revision;
        });
        revision
    }
}
