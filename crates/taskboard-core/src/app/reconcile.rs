//! Reconcile - 確定結果のマージと部分的な rollback
//!
//! リモートの結果をそのまま書き込むことはしない。
//! 待っている間に別のミューテーションが無関係なレコードを変えているかもしれないので、
//! 「今の」スナップショットに対象レコードだけを差し込む。

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::{Task, TaskId};

/// Replace the record with the same id. Absent ids are left absent.
pub fn replace_by_id(current: &[Task], confirmed: &Task) -> Vec<Task> {
    current
        .iter()
        .map(|t| if t.id == confirmed.id { confirmed.clone() } else { t.clone() })
        .collect()
}

/// Swap a placeholder for the server-confirmed record, in the same slot.
///
/// If a resync already dropped the placeholder, the confirmed record is appended,
/// unless the resync already brought it in.
pub fn replace_placeholder(current: &[Task], placeholder: TaskId, confirmed: &Task) -> Vec<Task> {
    let has_placeholder = current.iter().any(|t| t.id == placeholder);
    let has_confirmed = current.iter().any(|t| t.id == confirmed.id);
    match (has_placeholder, has_confirmed) {
        (true, false) => current
            .iter()
            .map(|t| if t.id == placeholder { confirmed.clone() } else { t.clone() })
            .collect(),
        (true, true) => remove_ids(current, &[placeholder]),
        (false, false) => {
            let mut next = current.to_vec();
            next.push(confirmed.clone());
            next
        }
        (false, true) => current.to_vec(),
    }
}

pub fn remove_ids(current: &[Task], ids: &[TaskId]) -> Vec<Task> {
    let ids: HashSet<TaskId> = ids.iter().copied().collect();
    current.iter().filter(|t| !ids.contains(&t.id)).cloned().collect()
}

/// Write `ordered` into the slots its ids occupy in `current`.
///
/// Records of `current` that are not in `ordered` keep their positions; records of
/// `ordered` that are not in `current` are dropped.
pub fn fill_slots(current: &[Task], ordered: &[Task]) -> Vec<Task> {
    let present: HashSet<TaskId> = current.iter().map(|t| t.id).collect();
    let wanted: HashSet<TaskId> = ordered.iter().map(|t| t.id).collect();
    let mut replacements = ordered.iter().filter(|t| present.contains(&t.id));

    current
        .iter()
        .map(|t| {
            if wanted.contains(&t.id) {
                replacements.next().cloned().unwrap_or_else(|| t.clone())
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Records of `source` for `ids`, in `ids` order. Unknown ids are skipped.
pub fn materialize(source: &[Task], ids: &[TaskId]) -> Vec<Task> {
    let by_id: HashMap<TaskId, &Task> = source.iter().map(|t| (t.id, t)).collect();
    ids.iter().filter_map(|id| by_id.get(id).map(|t| (*t).clone())).collect()
}

/// Take a fetched list as the new sequence, except for records still in flight.
///
/// In-flight records keep their current values and relative order. Ones the server
/// does not know yet (placeholders) are put back after their nearest kept
/// predecessor; ones removed locally stay removed.
pub fn overlay_in_flight(current: &[Task], fetched: &[Task], in_flight: &BTreeSet<TaskId>) -> Vec<Task> {
    if in_flight.is_empty() {
        return fetched.to_vec();
    }
    let local: HashSet<TaskId> = current.iter().map(|t| t.id).collect();
    let mut next: Vec<Task> = fetched
        .iter()
        .filter(|t| !in_flight.contains(&t.id) || local.contains(&t.id))
        .cloned()
        .collect();

    for (index, task) in current.iter().enumerate() {
        if !in_flight.contains(&task.id) || next.iter().any(|t| t.id == task.id) {
            continue;
        }
        let slot = current[..index]
            .iter()
            .rev()
            .find_map(|before| next.iter().position(|t| t.id == before.id))
            .map_or(0, |at| at + 1);
        next.insert(slot, task.clone());
    }

    let pending: Vec<Task> = current
        .iter()
        .filter(|t| in_flight.contains(&t.id))
        .cloned()
        .collect();
    fill_slots(&next, &pending)
}

/// Undo one mutation's optimistic apply when other writes happened since.
///
/// Only the `claimed` records are restored: previous field values, previous relative
/// order, removed ones reinserted, records that did not exist before dropped.
/// Everything else in `current` is kept as is.
pub fn restore_claimed(current: &[Task], previous: &[Task], claimed: &[TaskId]) -> Vec<Task> {
    let claimed: HashSet<TaskId> = claimed.iter().copied().collect();
    let previously: HashSet<TaskId> = previous.iter().map(|t| t.id).collect();

    let mut next: Vec<Task> = current
        .iter()
        .filter(|t| !claimed.contains(&t.id) || previously.contains(&t.id))
        .cloned()
        .collect();

    let present: HashSet<TaskId> = next.iter().map(|t| t.id).collect();
    for (index, task) in previous.iter().enumerate() {
        if claimed.contains(&task.id) && !present.contains(&task.id) {
            next.insert(index.min(next.len()), task.clone());
        }
    }

    let previous_claimed: Vec<Task> = previous
        .iter()
        .filter(|t| claimed.contains(&t.id))
        .cloned()
        .collect();
    fill_slots(&next, &previous_claimed)
}
