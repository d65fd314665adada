use std::sync::Arc;
use tasklist_core::db::open_db_in_memory;
use tasklist_core::{FixedClock, NameValidationError, NamedEntity, StoreError, TaskStore};
use uuid::Uuid;

fn store_at(now_ms: i64) -> (TaskStore, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now_ms));
    let store = TaskStore::with_clock(open_db_in_memory().unwrap(), clock.clone()).unwrap();
    (store, clock)
}

#[test]
fn create_list_stamps_clock_and_trims_name() {
    let (store, _clock) = store_at(1_000);

    let list = store.create_list("  Groceries ").unwrap();

    assert_eq!(list.name, "Groceries");
    assert_eq!(list.created_at, 1_000);
    assert!(!list.is_complete);
    assert_eq!(store.get_list(list.id).unwrap(), list);
    assert!(store.tasks_of(list.id).unwrap().is_empty());
}

#[test]
fn blank_names_fail_validation_and_change_nothing() {
    let (store, _clock) = store_at(0);
    let list = store.create_list("Groceries").unwrap();
    let task = store.create_task(list.id, "Milk", "").unwrap();
    let revision = store.revision();

    assert!(matches!(
        store.create_list("   "),
        Err(StoreError::Validation(NameValidationError::Blank(NamedEntity::TaskList)))
    ));
    assert!(matches!(
        store.create_task(list.id, "", "note"),
        Err(StoreError::Validation(NameValidationError::Blank(NamedEntity::Task)))
    ));
    assert!(matches!(
        store.rename_list(list.id, "\t"),
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.rename_task(task.id, " ", "x"),
        Err(StoreError::Validation(_))
    ));

    assert_eq!(store.lists().unwrap().len(), 1);
    assert_eq!(store.tasks_of(list.id).unwrap(), vec![task]);
    assert_eq!(store.revision(), revision);
}

#[test]
fn unknown_ids_fail_with_not_found() {
    let (store, _clock) = store_at(0);
    let missing = Uuid::new_v4();

    assert!(matches!(store.get_list(missing), Err(StoreError::ListNotFound(id)) if id == missing));
    assert!(matches!(store.get_task(missing), Err(StoreError::TaskNotFound(id)) if id == missing));
    assert!(matches!(
        store.create_task(missing, "Milk", ""),
        Err(StoreError::ListNotFound(_))
    ));
    assert!(matches!(store.rename_list(missing, "x"), Err(StoreError::ListNotFound(_))));
    assert!(matches!(store.mark_list_complete(missing), Err(StoreError::ListNotFound(_))));
    assert!(matches!(store.delete_list(missing), Err(StoreError::ListNotFound(_))));
    assert!(matches!(store.tasks_of(missing), Err(StoreError::ListNotFound(_))));
    assert!(matches!(store.rename_task(missing, "x", ""), Err(StoreError::TaskNotFound(_))));
    assert!(matches!(
        store.set_task_complete(missing, true),
        Err(StoreError::TaskNotFound(_))
    ));
    assert!(matches!(store.toggle_task_complete(missing), Err(StoreError::TaskNotFound(_))));
    assert!(matches!(store.delete_task(missing), Err(StoreError::TaskNotFound(_))));

    let err = store.delete_task(missing).unwrap_err();
    assert!(err.is_caller_error());
    assert_eq!(err.code(), "task_not_found");
    assert_eq!(store.revision(), 0);
}

#[test]
fn rename_task_replaces_note_verbatim() {
    let (store, _clock) = store_at(0);
    let list = store.create_list("Groceries").unwrap();
    let task = store.create_task(list.id, "Milk", "").unwrap();

    store.rename_task(task.id, " Oat milk ", "  barista edition\n").unwrap();

    let loaded = store.get_task(task.id).unwrap();
    assert_eq!(loaded.name, "Oat milk");
    assert_eq!(loaded.note, "  barista edition\n");
    assert_eq!(loaded.list_id, list.id);
    assert_eq!(loaded.created_at, task.created_at);
}

#[test]
fn delete_list_cascades_to_owned_tasks() {
    let (store, _clock) = store_at(0);
    let doomed = store.create_list("Moving").unwrap();
    let kept = store.create_list("Groceries").unwrap();
    let boxes = store.create_task(doomed.id, "Pack books", "").unwrap();
    let milk = store.create_task(kept.id, "Milk", "").unwrap();

    store.delete_list(doomed.id).unwrap();

    assert!(matches!(store.get_list(doomed.id), Err(StoreError::ListNotFound(_))));
    assert!(matches!(store.get_task(boxes.id), Err(StoreError::TaskNotFound(_))));
    assert_eq!(store.get_task(milk.id).unwrap(), milk);
    assert_eq!(store.lists().unwrap(), vec![kept]);
}

#[test]
fn idempotent_intents_do_not_bump_revision() {
    let (store, _clock) = store_at(0);
    let list = store.create_list("Groceries").unwrap();
    let task = store.create_task(list.id, "Milk", "").unwrap();
    assert_eq!(store.revision(), 2);

    store.set_task_complete(task.id, true).unwrap();
    store.set_task_complete(task.id, true).unwrap();
    assert_eq!(store.revision(), 3);

    store.mark_list_complete(list.id).unwrap();
    store.mark_list_complete(list.id).unwrap();
    assert_eq!(store.revision(), 4);
    assert!(store.get_list(list.id).unwrap().is_complete);

    store.rename_list(list.id, "Groceries").unwrap();
    store.rename_task(task.id, "Milk", "").unwrap();
    assert_eq!(store.revision(), 4);
}

#[test]
fn toggle_and_complete_all_report_changes() {
    let (store, clock) = store_at(0);
    let list = store.create_list("Groceries").unwrap();
    let milk = store.create_task(list.id, "Milk", "").unwrap();
    clock.advance(1);
    store.create_task(list.id, "Eggs", "").unwrap();
    clock.advance(1);
    store.create_task(list.id, "Bread", "").unwrap();

    assert!(store.toggle_task_complete(milk.id).unwrap());
    assert!(!store.toggle_task_complete(milk.id).unwrap());
    assert!(store.toggle_task_complete(milk.id).unwrap());

    let summary = store.list_summary(list.id).unwrap();
    assert_eq!((summary.incomplete_count, summary.complete_count), (2, 1));
    assert!(!summary.is_all_done());

    assert_eq!(store.complete_all_tasks(list.id).unwrap(), 2);
    let revision = store.revision();
    assert_eq!(store.complete_all_tasks(list.id).unwrap(), 0);
    assert_eq!(store.revision(), revision);
    assert!(store.list_summary(list.id).unwrap().is_all_done());
}

#[test]
fn tasks_of_returns_creation_order() {
    let (store, clock) = store_at(10);
    let list = store.create_list("Groceries").unwrap();
    let milk = store.create_task(list.id, "Milk", "").unwrap();
    clock.advance(5);
    let bread = store.create_task(list.id, "Bread", "").unwrap();
    clock.set(1);
    let apples = store.create_task(list.id, "Apples", "").unwrap();

    assert_eq!(store.tasks_of(list.id).unwrap(), vec![apples, milk, bread]);
}

#[test]
fn seed_sample_data_runs_only_on_empty_store() {
    let (store, _clock) = store_at(0);

    assert!(store.seed_sample_data().unwrap());
    assert_eq!(store.revision(), 1);
    let summaries = store.list_summaries().unwrap();
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|summary| summary.total() > 0));

    assert!(!store.seed_sample_data().unwrap());
    assert_eq!(store.revision(), 1);
    assert_eq!(store.lists().unwrap().len(), 2);
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasklist.db");

    let (list, task) = {
        let store = TaskStore::open(&path).unwrap();
        let list = store.create_list("Groceries").unwrap();
        let task = store.create_task(list.id, "Milk", "2 liters").unwrap();
        store.set_task_complete(task.id, true).unwrap();
        (list, task)
    };

    let reopened = TaskStore::open(&path).unwrap();
    assert_eq!(reopened.lists().unwrap(), vec![list.clone()]);
    let loaded = reopened.get_task(task.id).unwrap();
    assert_eq!(loaded.note, "2 liters");
    assert!(loaded.is_complete);
    assert_eq!(loaded.list_id, list.id);
}
