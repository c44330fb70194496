//! UI-facing mutations, each expressed through [`MutationCoordinator::mutate`].
//!
//! | 操作 | claim | 楽観的適用 | リモート | 確定時のマージ |
//! |---|---|---|---|---|
//! | create | placeholder | 末尾に追加 | create | placeholder を置き換え |
//! | toggle / update | その ID | patch を適用 | update | ID で置き換え |
//! | delete | その ID | 取り除く | delete | 取り除いたまま |
//! | reorder | 順序が変わるパーティションの ID | スロットを並べ替え | reorder（そのパーティションだけ） | 返ってきた順でスロットを埋める |
//! | move | 並びの保存済み ID すべて | フラグ反転 + 並べ替え | update → reorder | 同上 |
//!
//! placeholder はサーバーに送らない。並べ替えの対象にもしない（claim は create 側が持つ）。

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::{MutationError, NewTask, Partition, Task, TaskId, TaskPatch, ValidationError};
use crate::ports::TaskGateway;

use super::coordinator::{MutationCoordinator, MutationKind};
use super::projector::project;
use super::reconcile;
use super::resolver::{DropIntent, ResolutionKind, resolve};

impl<G: TaskGateway> MutationCoordinator<G> {
    /// Create a task. A placeholder is shown until the service confirms it.
    pub async fn create(&self, payload: NewTask) -> Result<Task, MutationError> {
        let payload = payload.validate()?;
        let placeholder_id = self.ids.placeholder_id();
        let placeholder = payload.clone().into_placeholder(placeholder_id, self.clock.now());

        self.mutate(
            MutationKind::Create,
            &[placeholder_id],
            move |current| {
                let mut next = current.to_vec();
                next.push(placeholder);
                next
            },
            || self.gateway.create(&payload),
            |current, created| reconcile::replace_placeholder(current, placeholder_id, created),
        )
        .await
    }

    /// Flip `completed` of the record as it is on the board now.
    pub async fn toggle_completion(&self, task: &Task) -> Result<Task, MutationError> {
        let current = self.saved(task.id)?;
        self.apply_patch(
            MutationKind::Toggle,
            task.id,
            TaskPatch::completion(!current.completed),
        )
        .await
    }

    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, MutationError> {
        let patch = patch.validate()?;
        self.saved(id)?;
        self.apply_patch(MutationKind::Update, id, patch).await
    }

    pub async fn delete(&self, task: &Task) -> Result<(), MutationError> {
        let id = task.id;
        self.saved(id)?;
        self.mutate(
            MutationKind::Delete,
            &[id],
            |current| reconcile::remove_ids(current, &[id]),
            || self.gateway.delete(id),
            // resync が途中で戻していても消したまま
            |current, _| reconcile::remove_ids(current, &[id]),
        )
        .await
    }

    /// Persist a new order for records of one partition.
    ///
    /// Only the partition whose relative order changes is claimed and sent, so a
    /// pending mutation in the other partition does not block the drop. When no
    /// order changes, nothing is sent.
    ///
    /// `preview` only supplies the order shown meanwhile; field values always
    /// come from the board as it is when the change is applied.
    pub async fn reorder_within_partition(
        &self,
        ordered_ids: Vec<TaskId>,
        preview: Option<&[Task]>,
    ) -> Result<Vec<Task>, MutationError> {
        saved_order(&ordered_ids)?;
        let shown = shown_order(&ordered_ids, preview);
        let changed = reordered_ids(&self.tasks(), &shown);
        if changed.is_empty() {
            debug!("order unchanged, nothing to persist");
            return Ok(reconcile::materialize(&self.tasks(), &shown));
        }

        self.mutate(
            MutationKind::Reorder,
            &changed,
            |current| reconcile::fill_slots(current, &reconcile::materialize(current, &shown)),
            || self.gateway.reorder(&changed),
            |current, returned| reconcile::fill_slots(current, returned),
        )
        .await
    }

    /// Move `moved` to the other partition and persist the new order.
    ///
    /// One optimistic change, two remote calls: the completion update, then the
    /// reorder. A failure of either rolls the whole change back locally. When the
    /// reorder fails after the update went through, the remote flag is put back
    /// if `compensate_partial_move` is set.
    pub async fn move_across_partition(
        &self,
        ordered_ids: Vec<TaskId>,
        moved: TaskId,
        completed: bool,
        preview: Option<&[Task]>,
    ) -> Result<Vec<Task>, MutationError> {
        let persisted = saved_order(&ordered_ids)?;
        if !ordered_ids.contains(&moved) {
            return Err(ValidationError::UnknownTask(moved).into());
        }
        let prior = self.saved(moved)?.completed;
        let shown = shown_order(&ordered_ids, preview);
        let compensate = self.options.compensate_partial_move;
        let gateway = &self.gateway;
        let ordered = &persisted;

        self.mutate(
            MutationKind::Move,
            &persisted,
            |current| {
                let flipped: Vec<Task> = current
                    .iter()
                    .map(|t| {
                        if t.id == moved {
                            Task {
                                completed,
                                ..t.clone()
                            }
                        } else {
                            t.clone()
                        }
                    })
                    .collect();
                reconcile::fill_slots(&flipped, &reconcile::materialize(&flipped, &shown))
            },
            move || async move {
                gateway.update(moved, &TaskPatch::completion(completed)).await?;
                match gateway.reorder(ordered).await {
                    Ok(returned) => Ok(returned),
                    Err(err) => {
                        if compensate {
                            match gateway.update(moved, &TaskPatch::completion(prior)).await {
                                Ok(_) => debug!(id = %moved, completed = prior, "move compensated"),
                                Err(e) => {
                                    warn!(id = %moved, error = %e, "compensating update failed")
                                }
                            }
                        }
                        Err(err)
                    }
                }
            },
            |current, returned| reconcile::fill_slots(current, returned),
        )
        .await
    }

    /// Resolve a drop against the current board and run the matching mutation.
    pub async fn apply_drop(&self, intent: DropIntent) -> Result<ResolutionKind, MutationError> {
        let resolution = resolve(&self.tasks(), &intent);
        match (resolution.kind, resolution.flip) {
            (ResolutionKind::Noop, _) => {
                debug!(?intent, "drop ignored");
                Ok(ResolutionKind::Noop)
            }
            (ResolutionKind::Move, Some(flip)) => {
                self.move_across_partition(
                    resolution.order,
                    flip.id,
                    flip.completed,
                    Some(resolution.preview.as_slice()),
                )
                .await?;
                Ok(ResolutionKind::Move)
            }
            (ResolutionKind::Reorder, _) | (ResolutionKind::Move, None) => {
                self.reorder_within_partition(resolution.order, Some(resolution.preview.as_slice()))
                    .await?;
                Ok(ResolutionKind::Reorder)
            }
        }
    }

    async fn apply_patch(
        &self,
        kind: MutationKind,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<Task, MutationError> {
        self.mutate(
            kind,
            &[id],
            |current| {
                current
                    .iter()
                    .map(|t| if t.id == id { patch.apply_to(t) } else { t.clone() })
                    .collect()
            },
            || self.gateway.update(id, &patch),
            |current, confirmed| reconcile::replace_by_id(current, confirmed),
        )
        .await
    }
}

/// The ids the service can order. Placeholders are left out.
fn saved_order(ordered_ids: &[TaskId]) -> Result<Vec<TaskId>, ValidationError> {
    let saved: Vec<TaskId> = ordered_ids
        .iter()
        .copied()
        .filter(|id| !id.is_placeholder())
        .collect();
    if saved.is_empty() {
        return Err(ValidationError::EmptyOrder);
    }
    Ok(saved)
}

/// Saved ids, in the new order, of each partition whose relative order `order` changes.
fn reordered_ids(current: &[Task], order: &[TaskId]) -> Vec<TaskId> {
    let wanted: HashSet<TaskId> = order.iter().copied().collect();
    let before: Vec<Task> = current.iter().filter(|t| wanted.contains(&t.id)).cloned().collect();
    let before = project(&before);
    let after = project(&reconcile::materialize(current, order));

    let saved = |tasks: &[Task]| -> Vec<TaskId> {
        tasks.iter().map(|t| t.id).filter(|id| !id.is_placeholder()).collect()
    };
    [Partition::Incomplete, Partition::Completed]
        .into_iter()
        .filter(|p| saved(before.get(*p)) != saved(after.get(*p)))
        .flat_map(|p| saved(after.get(p)))
        .collect()
}

/// Order to display while the change is pending: the preview's, restricted to `ordered_ids`.
fn shown_order(ordered_ids: &[TaskId], preview: Option<&[Task]>) -> Vec<TaskId> {
    match preview {
        Some(preview) => {
            let wanted: HashSet<TaskId> = ordered_ids.iter().copied().collect();
            preview.iter().map(|t| t.id).filter(|id| wanted.contains(id)).collect()
        }
        None => ordered_ids.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{BoardBuilder, CoordinatorOptions, DropIntent, Snapshot};
    use crate::domain::{ErrorKind, Partition};
    use crate::impls::{GatewayOp, InMemoryTaskGateway};
    use crate::ports::{Clock, FixedClock, GatewayError};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::Duration;

    type Board = MutationCoordinator<InMemoryTaskGateway>;

    /// A(1) B(2) 未完了, C(3) 完了
    async fn board(resync: bool, compensate: bool) -> Board {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let seed = vec![
            NewTask::new("A"),
            NewTask::new("B"),
            NewTask {
                completed: true,
                ..NewTask::new("C")
            },
        ];
        let board = BoardBuilder::new(InMemoryTaskGateway::with_tasks(clock.clone(), seed))
            .clock(clock)
            .options(CoordinatorOptions {
                resync_after_settle: resync,
                compensate_partial_move: compensate,
            })
            .build();
        board.refresh().await.unwrap();
        board
    }

    fn id(n: u64) -> TaskId {
        TaskId::Remote(n)
    }

    fn task(board: &Board, n: u64) -> Task {
        board.snapshot().get(id(n)).cloned().unwrap()
    }

    /// (title, completed) in sequence order
    fn view(tasks: &[Task]) -> Vec<(String, bool)> {
        tasks.iter().map(|t| (t.title.clone(), t.completed)).collect()
    }

    fn abc() -> Vec<(String, bool)> {
        vec![("A".into(), false), ("B".into(), false), ("C".into(), true)]
    }

    async fn ops(board: &Board) -> Vec<GatewayOp> {
        board.gateway().calls().await.into_iter().map(|c| c.op).collect()
    }

    #[rstest]
    #[case::with_resync(true)]
    #[case::without_resync(false)]
    #[tokio::test]
    async fn rejected_toggle_restores_previous(#[case] resync: bool) {
        let board = board(resync, true).await;
        board
            .gateway()
            .fail_next(GatewayOp::Update, GatewayError::rejected(500, "Database is locked"))
            .await;

        let err = board.toggle_completion(&task(&board, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.user_message(), "Database is locked");
        assert_eq!(view(&board.tasks()), abc());
    }

    #[tokio::test]
    async fn drop_across_partitions_moves_and_flips() {
        let board = board(true, true).await;
        let kind = board
            .apply_drop(DropIntent::before(id(1), id(3), Partition::Completed))
            .await
            .unwrap();

        assert_eq!(kind, ResolutionKind::Move);
        let expected: Vec<(String, bool)> =
            vec![("B".into(), false), ("A".into(), true), ("C".into(), true)];
        assert_eq!(view(&board.tasks()), expected);
        assert_eq!(view(&board.gateway().stored().await), expected);

        let parts = board.partitions();
        assert_eq!(parts.incomplete.len(), 1);
        assert_eq!(parts.completed.len(), 2);
    }

    #[rstest]
    #[case::with_resync(true)]
    #[case::without_resync(false)]
    #[tokio::test]
    async fn failed_reorder_rolls_back_the_whole_move(#[case] resync: bool) {
        let board = board(resync, true).await;
        board
            .gateway()
            .fail_next(GatewayOp::Reorder, GatewayError::rejected(500, "boom"))
            .await;

        let err = board
            .apply_drop(DropIntent::before(id(1), id(3), Partition::Completed))
            .await
            .unwrap_err();

        assert!(err.rolled_back());
        assert_eq!(view(&board.tasks()), abc());
        // 補償の update でサーバー側のフラグも戻っている
        assert_eq!(view(&board.gateway().stored().await), abc());
        let calls = ops(&board).await;
        assert_eq!(
            &calls[1..4],
            &[GatewayOp::Update, GatewayOp::Reorder, GatewayOp::Update]
        );
    }

    #[tokio::test]
    async fn without_compensation_resync_shows_the_persisted_flag() {
        let board = board(true, false).await;
        board
            .gateway()
            .fail_next(GatewayOp::Reorder, GatewayError::rejected(500, "boom"))
            .await;

        board
            .apply_drop(DropIntent::before(id(1), id(3), Partition::Completed))
            .await
            .unwrap_err();

        assert!(task(&board, 1).completed);
        assert_eq!(view(&board.tasks()), view(&board.gateway().stored().await));
    }

    #[tokio::test]
    async fn failed_flag_update_skips_the_reorder() {
        let board = board(false, true).await;
        board
            .gateway()
            .fail_next(GatewayOp::Update, GatewayError::unreachable("timeout"))
            .await;

        let err = board
            .move_across_partition(vec![id(2), id(1), id(3)], id(1), true, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unreachable);
        assert_eq!(view(&board.tasks()), abc());
        assert!(!ops(&board).await.contains(&GatewayOp::Reorder));
    }

    #[tokio::test]
    async fn offline_create_shows_then_removes_the_placeholder() {
        let board = board(true, true).await;
        board.gateway().set_offline(true).await;
        board.gateway().set_latency(Duration::from_millis(10)).await;

        let (result, during): (_, Snapshot) = tokio::join!(
            board.create(NewTask::new("draft").with_category("Home")),
            async { board.snapshot() }
        );

        let placeholder = during.tasks.last().unwrap();
        assert_eq!(during.tasks.len(), 4);
        assert!(placeholder.id.is_placeholder());
        assert_eq!(placeholder.title, "draft");
        assert!(during.is_in_flight(placeholder.id));

        let err = result.unwrap_err();
        assert_eq!(err.user_message(), "Could not reach server");
        assert_eq!(view(&board.tasks()), abc());
        assert!(board.snapshot().in_flight.is_empty());
    }

    #[tokio::test]
    async fn create_replaces_the_placeholder_with_the_saved_record() {
        let board = board(false, true).await;
        let created = board
            .create(NewTask::new("  D ").with_priority(7))
            .await
            .unwrap();

        assert_eq!(created.id, id(4));
        assert_eq!(created.title, "D");
        let tasks = board.tasks();
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[3], created);
        assert!(tasks.iter().all(|t| !t.id.is_placeholder()));
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_the_gateway() {
        let board = board(true, true).await;
        let revision = board.snapshot().revision;

        let err = board.create(NewTask::new("   ")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(board.snapshot().revision, revision);
        assert_eq!(ops(&board).await, vec![GatewayOp::List]);
    }

    #[tokio::test]
    async fn concurrent_toggles_on_different_tasks_both_land() {
        let board = board(true, true).await;
        board.gateway().set_latency(Duration::from_millis(20)).await;
        let (a, b) = (task(&board, 1), task(&board, 2));

        let (ra, rb, during) = tokio::join!(
            board.toggle_completion(&a),
            board.toggle_completion(&b),
            async { board.snapshot() }
        );

        // 両方とも確定前に楽観的に反映されている
        assert!(during.get(id(1)).unwrap().completed);
        assert!(during.get(id(2)).unwrap().completed);
        assert!(ra.unwrap().completed);
        assert!(rb.unwrap().completed);
        assert!(board.tasks().iter().all(|t| t.completed));
        assert_eq!(board.partitions().done(), 3);
    }

    #[tokio::test]
    async fn failed_delete_does_not_undo_a_concurrent_toggle() {
        let board = board(false, true).await;
        board.gateway().set_latency(Duration::from_millis(10)).await;
        board
            .gateway()
            .fail_next(GatewayOp::Delete, GatewayError::rejected(503, "Try again later"))
            .await;
        let (a, b) = (task(&board, 1), task(&board, 2));

        let (toggled, deleted) = tokio::join!(board.toggle_completion(&a), board.delete(&b));

        assert!(toggled.is_ok());
        assert_eq!(deleted.unwrap_err().user_message(), "Try again later");
        let expected: Vec<(String, bool)> =
            vec![("A".into(), true), ("B".into(), false), ("C".into(), true)];
        assert_eq!(view(&board.tasks()), expected);
    }

    #[tokio::test]
    async fn same_task_cannot_be_changed_twice_at_once() {
        let board = board(true, true).await;
        board.gateway().set_latency(Duration::from_millis(10)).await;
        let a = task(&board, 1);

        let (toggled, renamed) = tokio::join!(
            board.toggle_completion(&a),
            board.update(
                a.id,
                TaskPatch {
                    title: Some("A2".into()),
                    ..Default::default()
                }
            )
        );

        assert!(toggled.is_ok());
        assert_eq!(renamed.unwrap_err().kind(), ErrorKind::Conflict);
        assert_eq!(task(&board, 1).title, "A");
        assert!(task(&board, 1).completed);
    }

    #[tokio::test]
    async fn drop_during_a_pending_toggle_is_busy() {
        let board = board(false, true).await;
        board.gateway().set_latency(Duration::from_millis(10)).await;
        let b = task(&board, 2);

        let (toggled, dropped) = tokio::join!(
            board.toggle_completion(&b),
            board.apply_drop(DropIntent::before(id(2), id(1), Partition::Incomplete))
        );

        assert!(toggled.is_ok());
        assert!(matches!(dropped, Err(MutationError::Busy { .. })));
    }

    #[tokio::test]
    async fn delete_removes_the_task_everywhere() {
        let board = board(true, true).await;
        board.delete(&task(&board, 2)).await.unwrap();
        assert_eq!(board.tasks().len(), 2);
        assert_eq!(board.gateway().stored().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_delete_reinserts_at_the_old_position() {
        let board = board(false, true).await;
        board
            .gateway()
            .fail_next(GatewayOp::Delete, GatewayError::rejected(404, "Task not found"))
            .await;

        board.delete(&task(&board, 2)).await.unwrap_err();
        assert_eq!(view(&board.tasks()), abc());
    }

    #[tokio::test]
    async fn reorder_within_a_partition_persists() {
        let board = board(true, true).await;
        let kind = board
            .apply_drop(DropIntent::before(id(2), id(1), Partition::Incomplete))
            .await
            .unwrap();

        assert_eq!(kind, ResolutionKind::Reorder);
        let titles: Vec<String> = board.tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
        let stored: Vec<String> = board
            .gateway()
            .stored()
            .await
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(stored, titles);
    }

    #[tokio::test]
    async fn drop_of_unknown_task_makes_no_call() {
        let board = board(true, true).await;
        let kind = board
            .apply_drop(DropIntent::end_of(id(99), Partition::Completed))
            .await
            .unwrap();
        assert_eq!(kind, ResolutionKind::Noop);
        assert_eq!(ops(&board).await, vec![GatewayOp::List]);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::placeholders_only(vec![TaskId::placeholder(ulid::Ulid::nil())])]
    #[tokio::test]
    async fn orders_without_saved_tasks_are_rejected_up_front(#[case] order: Vec<TaskId>) {
        let board = board(true, true).await;
        let err = board.reorder_within_partition(order, None).await.unwrap_err();
        assert_eq!(err, MutationError::Validation(ValidationError::EmptyOrder));
        assert_eq!(ops(&board).await, vec![GatewayOp::List]);
    }

    #[tokio::test]
    async fn drop_in_place_makes_no_call() {
        let board = board(true, true).await;
        let kind = board
            .apply_drop(DropIntent::before(id(1), id(1), Partition::Incomplete))
            .await
            .unwrap();
        assert_eq!(kind, ResolutionKind::Reorder);
        assert_eq!(view(&board.tasks()), abc());
        assert_eq!(ops(&board).await, vec![GatewayOp::List]);
    }

    #[tokio::test]
    async fn reorder_sends_only_the_changed_partition() {
        let board = board(false, true).await;
        board
            .apply_drop(DropIntent::before(id(2), id(1), Partition::Incomplete))
            .await
            .unwrap();

        let calls = board.gateway().calls().await;
        let reorder = calls.iter().find(|c| c.op == GatewayOp::Reorder).unwrap();
        assert_eq!(reorder.ids, vec![id(2), id(1)]);
    }

    #[tokio::test]
    async fn reorder_proceeds_while_the_other_partition_is_pending() {
        let board = board(true, true).await;
        board.gateway().set_latency(Duration::from_millis(10)).await;
        let rename = TaskPatch {
            title: Some("C2".into()),
            ..Default::default()
        };

        let (renamed, dropped) = tokio::join!(
            board.update(id(3), rename),
            board.apply_drop(DropIntent::before(id(2), id(1), Partition::Incomplete))
        );

        assert_eq!(renamed.unwrap().title, "C2");
        assert_eq!(dropped.unwrap(), ResolutionKind::Reorder);
        let parts = board.partitions();
        let incomplete: Vec<(String, bool)> = vec![("B".into(), false), ("A".into(), false)];
        let completed: Vec<(String, bool)> = vec![("C2".into(), true)];
        assert_eq!(view(&parts.incomplete), incomplete);
        assert_eq!(view(&parts.completed), completed);
    }

    #[tokio::test]
    async fn drop_proceeds_while_an_unrelated_create_is_pending() {
        let board = board(true, true).await;
        board.gateway().set_latency(Duration::from_millis(10)).await;

        let (created, dropped) = tokio::join!(
            board.create(NewTask::new("D")),
            board.apply_drop(DropIntent::before(id(2), id(1), Partition::Incomplete))
        );

        assert_eq!(created.unwrap().id, id(4));
        assert_eq!(dropped.unwrap(), ResolutionKind::Reorder);
        let reorders: Vec<Vec<TaskId>> = board
            .gateway()
            .calls()
            .await
            .into_iter()
            .filter(|c| c.op == GatewayOp::Reorder)
            .map(|c| c.ids)
            .collect();
        assert_eq!(reorders, vec![vec![id(2), id(1)]]);

        let incomplete: Vec<String> = board.partitions().incomplete.into_iter().map(|t| t.title).collect();
        assert_eq!(incomplete, vec!["B", "A", "D"]);
    }

    #[tokio::test]
    async fn resync_from_another_settle_keeps_a_pending_create() {
        let board = board(true, true).await;
        board.gateway().set_latency(Duration::from_millis(50)).await;

        let (created, during) = tokio::join!(board.create(NewTask::new("D")), async {
            // create は 50ms 待っている。こちらは待たずに toggle → resync まで済ませる
            board.gateway().set_latency(Duration::ZERO).await;
            board.toggle_completion(&task(&board, 1)).await.unwrap();
            board.snapshot()
        });

        assert!(during.get(id(1)).unwrap().completed);
        assert_eq!(during.tasks.len(), 4);
        let placeholder = during.tasks.last().unwrap();
        assert!(placeholder.id.is_placeholder());
        assert_eq!(placeholder.title, "D");
        assert!(during.is_in_flight(placeholder.id));

        assert_eq!(created.unwrap().id, id(4));
        let tasks = board.tasks();
        assert_eq!(tasks.len(), 4);
        assert!(tasks.iter().all(|t| !t.id.is_placeholder()));
    }

    #[tokio::test]
    async fn resync_keeps_a_pending_toggle() {
        let board = board(true, true).await;
        board.gateway().set_latency(Duration::from_millis(50)).await;

        let target = task(&board, 1);
        let (toggled, during) = tokio::join!(board.toggle_completion(&target), async {
            board.gateway().set_latency(Duration::ZERO).await;
            board.refresh().await.unwrap();
            board.snapshot()
        });

        // サーバーはまだ未完了のまま返すが、楽観的な値が残る
        assert!(during.get(id(1)).unwrap().completed);
        assert!(toggled.unwrap().completed);
        assert!(task(&board, 1).completed);
    }

    #[rstest]
    #[case::unknown(id(42), ValidationError::UnknownTask(id(42)))]
    #[case::placeholder(
        TaskId::placeholder(ulid::Ulid::nil()),
        ValidationError::PlaceholderId(TaskId::placeholder(ulid::Ulid::nil()))
    )]
    #[tokio::test]
    async fn update_needs_a_saved_task(#[case] target: TaskId, #[case] expected: ValidationError) {
        let board = board(true, true).await;
        let err = board
            .update(target, TaskPatch::completion(true))
            .await
            .unwrap_err();
        assert_eq!(err, MutationError::Validation(expected));
    }
}
