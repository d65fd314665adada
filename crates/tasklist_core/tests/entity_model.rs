use tasklist_core::{Entity, Task, TaskList, TaskListSummary};
use uuid::Uuid;

#[test]
fn new_list_is_incomplete_with_stable_id() {
    let list = TaskList::new("Groceries", 1_700_000_000_000);

    assert_eq!(list.name, "Groceries");
    assert!(!list.is_complete);
    assert_ne!(list.id, Uuid::nil());
    assert_eq!(list.entity_id(), list.id);
}

#[test]
fn same_entity_compares_identity_only() {
    let list_id = Uuid::new_v4();
    let task = Task::new(list_id, "Milk", "", 1);
    let mut renamed = task.clone();
    renamed.name = "Oat milk".to_string();
    let other = Task::new(list_id, "Milk", "", 1);

    assert!(task.same_entity(&renamed));
    assert_ne!(task, renamed);
    assert!(!task.same_entity(&other));
}

#[test]
fn task_serializes_with_snake_case_fields() {
    let list_id = Uuid::new_v4();
    let task = Task::new(list_id, "Eggs", "a dozen", 42);

    let value = serde_json::to_value(&task).unwrap();
    assert_eq!(value["list_id"], list_id.to_string());
    assert_eq!(value["name"], "Eggs");
    assert_eq!(value["note"], "a dozen");
    assert_eq!(value["created_at"], 42);
    assert_eq!(value["is_complete"], false);

    let decoded: Task = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn summary_is_all_done_only_with_tasks_and_none_incomplete() {
    let list = TaskList::new("Moving", 0);
    let summary = |incomplete_count, complete_count| TaskListSummary {
        list: list.clone(),
        incomplete_count,
        complete_count,
    };

    assert!(!summary(0, 0).is_all_done());
    assert!(!summary(1, 2).is_all_done());
    assert!(summary(0, 3).is_all_done());
    assert_eq!(summary(1, 2).total(), 3);
}
