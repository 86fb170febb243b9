//! Kanban drag-and-drop transition engine.
//!
//! # Responsibility
//! - Track the task picked up by a drag gesture.
//! - Resolve the drop target and turn it into at most one status change.
//!
//! # Invariants
//! - Picking up a task never mutates the store.
//! - A drop changes only `status`; every other field is passed through.
//! - Dropping onto the task's current column is a no-op and leaves
//!   `updated_at` untouched.
//! - `end` always clears the active drag.

use crate::model::task::TaskStatus;
use crate::model::EntityId;
use crate::repo::blob_repo::BlobRepository;
use crate::service::study_store::{StoreResult, StudyStore};
use log::{debug, info};

/// Where a dragged card was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Released outside any droppable area.
    Outside,
    /// Released over a column; empty columns included.
    Column(TaskStatus),
    /// Released over something that is not a column, e.g. another card.
    Other(String),
}

impl DropTarget {
    /// Maps the droppable id reported by the gesture layer to a target.
    pub fn resolve(over_id: Option<&str>) -> Self {
        match over_id {
            None => Self::Outside,
            Some(id) => match TaskStatus::parse(id) {
                Some(status) => Self::Column(status),
                None => Self::Other(id.to_string()),
            },
        }
    }
}

/// Result of finishing a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// `end` was called without a preceding `begin`.
    NoActiveDrag,
    /// Released outside every target.
    Aborted,
    /// Released over a non-column droppable.
    NotAColumn,
    /// The dragged task disappeared while it was being dragged.
    TaskMissing,
    /// Released on the column the task is already in.
    Unchanged,
    Moved { from: TaskStatus, to: TaskStatus },
}

impl DropOutcome {
    pub fn is_move(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Transient state for one board's drag gestures.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    active: Option<EntityId>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the picked-up task. Replaces any unfinished drag.
    pub fn begin(&mut self, task_id: impl Into<EntityId>) {
        let task_id = task_id.into();
        debug!("event=drag_start module=kanban task_id={}", task_id);
        self.active = Some(task_id);
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Drops the gesture without touching the store.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Finishes the gesture over `over_id` and applies the move, if any.
    pub fn end<B: BlobRepository>(
        &mut self,
        store: &mut StudyStore<B>,
        over_id: Option<&str>,
    ) -> StoreResult<DropOutcome> {
        let Some(task_id) = self.active.take() else {
            return Ok(DropOutcome::NoActiveDrag);
        };
        move_task(store, &task_id, DropTarget::resolve(over_id))
    }
}

/// Applies a resolved drop to one task.
pub fn move_task<B: BlobRepository>(
    store: &mut StudyStore<B>,
    task_id: &str,
    target: DropTarget,
) -> StoreResult<DropOutcome> {
    let to = match target {
        DropTarget::Outside => return Ok(DropOutcome::Aborted),
        DropTarget::Other(_) => return Ok(DropOutcome::NotAColumn),
        DropTarget::Column(status) => status,
    };
    let Some(task) = store.find_task(task_id) else {
        return Ok(DropOutcome::TaskMissing);
    };
    let from = task.status;
    if from == to {
        return Ok(DropOutcome::Unchanged);
    }

    let mut moved = task.clone();
    moved.status = to;
    store.update_task(moved)?;
    info!(
        "event=drag_end module=kanban status=ok task_id={} from={} to={}",
        task_id, from, to
    );
    Ok(DropOutcome::Moved { from, to })
}
