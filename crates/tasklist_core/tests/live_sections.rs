use std::sync::{Arc, Mutex};
use tasklist_core::db::open_db_in_memory;
use tasklist_core::{
    CompletionFilter, FixedClock, IndexPath, SectionsEvent, SortKey, Task, TaskQuery, TaskStore,
};

fn seeded_store() -> (TaskStore, Vec<Task>) {
    let clock = Arc::new(FixedClock::new(0));
    let store = TaskStore::with_clock(open_db_in_memory().unwrap(), clock.clone()).unwrap();
    let list = store.create_list("Groceries").unwrap();
    let tasks = ["Milk", "Eggs", "Bread"]
        .into_iter()
        .map(|name| {
            clock.advance(1);
            store.create_task(list.id, name, "").unwrap()
        })
        .collect();
    (store, tasks)
}

fn record(sections: &tasklist_core::LiveSections<Task>) -> Arc<Mutex<Vec<SectionsEvent<Task>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    sections.on_change(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn toggling_completion_is_one_cross_section_move() {
    let (store, tasks) = seeded_store();
    let list_id = tasks[0].list_id;
    let sections = store
        .watch_list_sections(list_id, SortKey::CreatedAt)
        .unwrap();
    let mut mirror = sections.current_sections();
    let events = record(&sections);

    store.toggle_task_complete(tasks[1].id).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let changes = events[0].changes();
    assert_eq!(changes.moves.len(), 1);
    assert_eq!(changes.moves[0].from, IndexPath::new(0, 1));
    assert_eq!(changes.moves[0].to, IndexPath::new(1, 0));
    assert!(changes.moves[0].entity.is_complete);
    assert!(changes.sections.iter().all(|section| section.is_empty()));
    assert_eq!(events[0].revision(), store.revision());

    changes.apply(&mut mirror);
    assert_eq!(mirror, sections.current_sections());
    assert_eq!(sections.index_path_of(tasks[1].id), Some(IndexPath::new(1, 0)));
}

#[test]
fn residual_changes_stay_in_their_section() {
    let (store, tasks) = seeded_store();
    let list_id = tasks[0].list_id;
    store.set_task_complete(tasks[2].id, true).unwrap();
    let sections = store
        .watch_task_sections(vec![
            TaskQuery::in_list(list_id, CompletionFilter::Incomplete),
            TaskQuery::in_list(list_id, CompletionFilter::Complete),
        ])
        .unwrap();
    assert_eq!(sections.section_count(), 2);
    let events = record(&sections);

    store.delete_task(tasks[0].id).unwrap();
    store.complete_all_tasks(list_id).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    let deletion = events[0].changes();
    assert!(deletion.moves.is_empty());
    assert_eq!(deletion.sections[0].removals.len(), 1);
    assert_eq!(deletion.sections[0].removals[0].position, 0);
    assert!(deletion.sections[1].is_empty());

    let completion = events[1].changes();
    assert_eq!(completion.moves.len(), 1);
    assert_eq!(completion.moves[0].entity.id, tasks[1].id);
    assert!(sections.section(0).is_empty());
    assert_eq!(sections.section(1).len(), 2);
}

#[test]
fn deleting_the_list_invalidates_every_section() {
    let (store, tasks) = seeded_store();
    let list_id = tasks[0].list_id;
    store.set_task_complete(tasks[0].id, true).unwrap();
    let sections = store
        .watch_list_sections(list_id, SortKey::Name)
        .unwrap();
    let events = record(&sections);
    assert_eq!(store.live_view_count(), 1);

    store.delete_list(list_id).unwrap();

    {
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SectionsEvent::ScopeInvalidated { .. }));
        let changes = events[0].changes();
        assert!(changes.moves.is_empty());
        assert_eq!(changes.sections[0].removals.len(), 2);
        assert_eq!(changes.sections[1].removals.len(), 1);
    }
    assert!(sections.current_sections().iter().all(Vec::is_empty));
    assert_eq!(store.live_view_count(), 0);
}
