use tasklist_core::db::open_db_in_memory;
use tasklist_core::repo::list_repo::{ListRepository, SqliteListRepository};
use tasklist_core::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use tasklist_core::repo::RepoError;
use tasklist_core::{CompletionFilter, ListQuery, SortKey, Task, TaskList, TaskQuery};
use uuid::Uuid;

#[test]
fn query_tasks_filters_scope_and_completion() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::new(&conn);
    let tasks = SqliteTaskRepository::new(&conn);
    let groceries = TaskList::new("Groceries", 1);
    let moving = TaskList::new("Moving", 2);
    lists.insert_list(&groceries).unwrap();
    lists.insert_list(&moving).unwrap();

    let milk = Task::new(groceries.id, "Milk", "", 10);
    let bread = Task::new(groceries.id, "Bread", "", 11);
    let boxes = Task::new(moving.id, "Boxes", "", 12);
    for task in [&milk, &bread, &boxes] {
        tasks.insert_task(task).unwrap();
    }
    assert!(tasks.set_task_complete(bread.id, true).unwrap());
    assert!(!tasks.set_task_complete(bread.id, true).unwrap());

    let incomplete = tasks
        .query_tasks(&TaskQuery::in_list(groceries.id, CompletionFilter::Incomplete))
        .unwrap();
    assert_eq!(incomplete, vec![milk.clone()]);

    let everything_by_name = tasks
        .query_tasks(&TaskQuery::default().sorted_by(SortKey::Name))
        .unwrap()
        .into_iter()
        .map(|task| task.name)
        .collect::<Vec<_>>();
    assert_eq!(everything_by_name, ["Boxes", "Bread", "Milk"]);

    assert_eq!(tasks.completion_counts(groceries.id).unwrap(), (1, 1));
    assert_eq!(tasks.completion_counts(moving.id).unwrap(), (1, 0));
}

#[test]
fn query_lists_filters_completion() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::new(&conn);
    let open = TaskList::new("Open", 1);
    let done = TaskList::new("Done", 2);
    lists.insert_list(&open).unwrap();
    lists.insert_list(&done).unwrap();
    lists.set_list_complete(done.id, true).unwrap();

    let complete = lists
        .query_lists(&ListQuery::new(CompletionFilter::Complete, SortKey::CreatedAt))
        .unwrap();
    assert_eq!(complete.len(), 1);
    assert_eq!(complete[0].id, done.id);
    assert_eq!(lists.count_lists().unwrap(), 2);
}

#[test]
fn repositories_share_a_transaction_and_roll_back_with_it() {
    let mut conn = open_db_in_memory().unwrap();
    let list = TaskList::new("Groceries", 1);
    {
        let tx = conn.transaction().unwrap();
        SqliteListRepository::new(&tx).insert_list(&list).unwrap();
        SqliteTaskRepository::new(&tx)
            .insert_task(&Task::new(list.id, "Milk", "", 2))
            .unwrap();
        // Dropped without commit.
    }

    let lists = SqliteListRepository::new(&conn);
    assert!(!lists.list_exists(list.id).unwrap());
    assert_eq!(lists.count_lists().unwrap(), 0);
}

#[test]
fn delete_list_reports_cascaded_tasks() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::new(&conn);
    let tasks = SqliteTaskRepository::new(&conn);
    let list = TaskList::new("Moving", 1);
    lists.insert_list(&list).unwrap();
    tasks.insert_task(&Task::new(list.id, "Boxes", "", 2)).unwrap();
    tasks.insert_task(&Task::new(list.id, "Tape", "", 3)).unwrap();

    assert_eq!(lists.delete_list(list.id).unwrap(), 2);
    assert!(matches!(lists.delete_list(list.id), Err(RepoError::ListNotFound(_))));
}

#[test]
fn insert_task_requires_existing_list() {
    let conn = open_db_in_memory().unwrap();
    let tasks = SqliteTaskRepository::new(&conn);

    let err = tasks
        .insert_task(&Task::new(Uuid::new_v4(), "Orphan", "", 0))
        .unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(_)));
}

#[test]
fn invalid_persisted_rows_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO task_lists (id, name, created_at, is_complete)
         VALUES ('not-a-uuid', 'Broken', 0, 0);",
        [],
    )
    .unwrap();

    let err = SqliteListRepository::new(&conn)
        .query_lists(&ListQuery::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
