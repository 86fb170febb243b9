use chrono::NaiveDate;
use std::time::Duration;
use studyplan_core::{
    DragSession, DropOutcome, ManualClock, MemoryBlobRepository, NewTask, StudyStore,
    StudyTask, TaskStatus,
};

fn board(clock: &ManualClock) -> (StudyStore<MemoryBlobRepository>, StudyTask) {
    let mut store = StudyStore::open(MemoryBlobRepository::new(), clock.shared());
    store.add_subject("Math").unwrap();
    let task = store
        .create_task(NewTask::new(
            "HW1",
            "Math",
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        ))
        .unwrap();
    (store, task)
}

#[test]
fn drop_on_other_column_moves_task_and_changes_only_status() {
    let clock = ManualClock::default();
    let (mut store, task) = board(&clock);
    clock.advance(Duration::from_secs(1));

    let mut drag = DragSession::new();
    drag.begin(task.id.clone());
    let outcome = drag.end(&mut store, Some("inProgress")).unwrap();

    assert_eq!(
        outcome,
        DropOutcome::Moved {
            from: TaskStatus::ToStudy,
            to: TaskStatus::InProgress
        }
    );
    assert!(drag.active().is_none());
    assert!(store.data().tasks.to_study.is_empty());

    let moved = &store.data().tasks.in_progress[0];
    assert!(moved.updated_at > task.updated_at);
    let mut expected = task.clone();
    expected.status = TaskStatus::InProgress;
    expected.updated_at = moved.updated_at;
    assert_eq!(moved, &expected);
}

#[test]
fn drop_on_same_column_is_noop() {
    let clock = ManualClock::default();
    let (mut store, task) = board(&clock);
    clock.advance(Duration::from_secs(1));

    let mut drag = DragSession::new();
    drag.begin(task.id.clone());
    assert_eq!(
        drag.end(&mut store, Some("toStudy")).unwrap(),
        DropOutcome::Unchanged
    );
    assert_eq!(store.find_task(&task.id).unwrap(), &task);
}

#[test]
fn drop_outside_or_on_card_leaves_board_untouched() {
    let clock = ManualClock::default();
    let (mut store, task) = board(&clock);
    let snapshot = store.data().clone();
    let mut drag = DragSession::new();

    drag.begin(task.id.clone());
    assert_eq!(drag.end(&mut store, None).unwrap(), DropOutcome::Aborted);

    drag.begin(task.id.clone());
    assert_eq!(
        drag.end(&mut store, Some(task.id.as_str())).unwrap(),
        DropOutcome::NotAColumn
    );

    assert_eq!(store.data(), &snapshot);
    assert_eq!(drag.end(&mut store, Some("revision")).unwrap(), DropOutcome::NoActiveDrag);
}

#[test]
fn drop_into_empty_column_is_accepted() {
    let clock = ManualClock::default();
    let (mut store, task) = board(&clock);
    assert!(store.data().tasks.completed.is_empty());

    let mut drag = DragSession::new();
    drag.begin(task.id.clone());
    assert!(drag.end(&mut store, Some("completed")).unwrap().is_move());
    assert_eq!(store.data().tasks.completed.len(), 1);
}

#[test]
fn task_deleted_mid_drag_is_reported_missing() {
    let clock = ManualClock::default();
    let (mut store, task) = board(&clock);

    let mut drag = DragSession::new();
    drag.begin(task.id.clone());
    store.delete_task(&task.id);

    assert_eq!(
        drag.end(&mut store, Some("revision")).unwrap(),
        DropOutcome::TaskMissing
    );
    assert!(store.data().tasks.is_empty());
}

#[test]
fn picking_up_does_not_persist_anything() {
    let clock = ManualClock::default();
    let (store, task) = board(&clock);
    let persisted = store.storage().load();

    let mut drag = DragSession::new();
    drag.begin(task.id.clone());
    drag.cancel();

    assert_eq!(store.storage().load(), persisted);
    assert!(drag.active().is_none());
}
