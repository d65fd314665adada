//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `tasklist_core` end to end: open, seed, mutate, observe.
//! - Keep output deterministic apart from generated ids.
//!
//! Usage: `tasklist_cli [DB_PATH]` (in-memory store when omitted).

use std::process::ExitCode;
use tasklist_core::{core_version, SortKey, StoreResult, TaskStore};

fn main() -> ExitCode {
    println!("tasklist_core version={}", core_version());
    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error code={} message={err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<String>) -> StoreResult<()> {
    let store = match db_path {
        Some(path) => TaskStore::open(path)?,
        None => TaskStore::open_in_memory()?,
    };
    let seeded = store.seed_sample_data()?;
    println!("seeded={seeded} revision={}", store.revision());

    for summary in store.list_summaries()? {
        println!(
            "list name={:?} incomplete={} complete={} all_done={}",
            summary.list.name,
            summary.incomplete_count,
            summary.complete_count,
            summary.is_all_done()
        );
    }

    let Some(first) = store.lists()?.into_iter().next() else {
        return Ok(());
    };
    let sections = store.watch_list_sections(first.id, SortKey::Name)?;
    sections.on_change(|event| {
        let changes = event.changes();
        println!(
            "event revision={} cross_section_moves={}",
            event.revision(),
            changes.moves.len()
        );
    });

    if let Some(task) = sections.section(0).into_iter().next() {
        let complete = store.toggle_task_complete(task.id)?;
        println!("toggled task={:?} complete={complete}", task.name);
    }
    let current = sections.current_sections();
    println!(
        "list name={:?} current={} completed={}",
        first.name,
        current.first().map_or(0, Vec::len),
        current.get(1).map_or(0, Vec::len)
    );
    Ok(())
}
