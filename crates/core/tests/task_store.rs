//! Task store behaviour against real backends

mod common;

use std::sync::Arc;

use chrono::NaiveDateTime;
use kv_store::{FileBackend, KeyValueBackend, MemoryBackend};
use tempfile::TempDir;
use todo_core::task::{LoadOutcome, NoteKind, TaskPatch, TaskStatus, TaskStore, NOTE_DATE_FORMAT};
use todo_core::StoreConfig;

use common::{frozen_clock, init_tracing, store_over};

#[tokio::test]
async fn test_round_trip_across_restart() {
    let temp = TempDir::new().unwrap();
    let backend: Arc<dyn KeyValueBackend> = Arc::new(FileBackend::new(temp.path()));

    let saved = {
        let store = store_over(backend.clone());
        assert_eq!(store.load().await, LoadOutcome::Empty);

        let groceries = store.add_task("Groceries").await.unwrap();
        let report = store.add_task("Report").await.unwrap();
        store.add_task("Gym").await.unwrap();
        store
            .add_note(&groceries.id, NoteKind::Text, "buy milk")
            .await
            .unwrap();
        store
            .add_note(&groceries.id, NoteKind::Photo, "file:///list.jpg")
            .await
            .unwrap();
        store
            .set_status(&report.id, TaskStatus::InProgress)
            .await
            .unwrap();
        store.tasks().await
    };

    let store = store_over(backend);
    assert_eq!(store.load().await, LoadOutcome::Loaded { count: 3 });
    assert_eq!(store.tasks().await, saved);

    let names: Vec<String> = store.tasks().await.iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["Groceries", "Report", "Gym"]);
}

#[tokio::test]
async fn test_clear_all_survives_restart() {
    let temp = TempDir::new().unwrap();
    let backend: Arc<dyn KeyValueBackend> = Arc::new(FileBackend::new(temp.path()));

    {
        let store = store_over(backend.clone());
        store.add_task("One").await.unwrap();
        store.add_task("Two").await.unwrap();
        store.clear_all().await.unwrap();
        assert!(store.tasks().await.is_empty());
    }

    let store = store_over(backend);
    assert_eq!(store.load().await, LoadOutcome::Empty);
    assert!(store.tasks().await.is_empty());
}

#[tokio::test]
async fn test_note_append_format() {
    let store = store_over(Arc::new(MemoryBackend::new()));
    let task = store.add_task("Shopping").await.unwrap();

    let task = store
        .add_note(&task.id, NoteKind::Text, "buy milk")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(task.notes.len(), 1);
    let note = &task.notes[0];
    assert_eq!(note.text(), "buy milk");
    assert_eq!(note.kind, NoteKind::Text);

    // DD.MM.YYYY HH:MM
    let date = note.date.as_bytes();
    assert_eq!(date.len(), 16);
    assert_eq!((date[2], date[5], date[10], date[13]), (b'.', b'.', b' ', b':'));
    assert!(NaiveDateTime::parse_from_str(&note.date, NOTE_DATE_FORMAT).is_ok());
}

#[tokio::test]
async fn test_concurrent_patches_on_same_task_both_apply() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_over(backend.clone());
    let task = store.add_task("Race").await.unwrap();
    let writes_before = backend.write_count();

    // Both patches are built from the same pre-mutation snapshot
    let snapshot = store.get(&task.id).await.unwrap();
    let mut notes = snapshot.notes.clone();
    notes.push(todo_core::task::Note::new(
        "note-1",
        NoteKind::Text,
        "started",
        frozen_clock_now(),
    ));

    let (status, with_notes) = tokio::join!(
        store.update_task(&task.id, TaskPatch::new().with_status(TaskStatus::InProgress)),
        store.update_task(&task.id, TaskPatch::new().with_notes(notes.clone())),
    );
    status.unwrap().unwrap();
    with_notes.unwrap().unwrap();

    let stored = store.get(&task.id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::InProgress);
    assert_eq!(stored.notes, notes);
    assert_eq!(backend.write_count(), writes_before + 2);
}

#[tokio::test]
async fn test_stale_note_lists_last_applied_wins() {
    let store = store_over(Arc::new(MemoryBackend::new()));
    let task = store.add_task("Stale").await.unwrap();

    let make = |text: &str| {
        vec![todo_core::task::Note::new(
            text,
            NoteKind::Text,
            text,
            frozen_clock_now(),
        )]
    };

    // Whole-field patches replace the field; the one applied second stays
    let (first, second) = tokio::join!(
        store.update_task(&task.id, TaskPatch::new().with_notes(make("first"))),
        store.update_task(&task.id, TaskPatch::new().with_notes(make("second"))),
    );
    first.unwrap();
    second.unwrap();

    let stored = store.get(&task.id).await.unwrap();
    assert_eq!(stored.notes, make("second"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_note_appends_are_not_lost() {
    let backend = Arc::new(MemoryBackend::new());
    let store = store_over(backend.clone());
    let task = store.add_task("Busy").await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let store = store.clone();
            let id = task.id.clone();
            tokio::spawn(async move {
                store
                    .add_note(&id, NoteKind::Text, &format!("note {}", i))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let stored = store.get(&task.id).await.unwrap();
    assert_eq!(stored.notes.len(), 20);
    assert_eq!(backend.write_count(), 21);

    let mut ids: Vec<_> = stored.notes.iter().map(|n| n.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_corrupt_blob_is_quarantined() {
    let backend = Arc::new(MemoryBackend::with_entries([("tasks", "{not json")]));
    let store = store_over(backend.clone());

    match store.load().await {
        LoadOutcome::Corrupt { reason } => assert!(!reason.is_empty()),
        other => panic!("Expected Corrupt outcome, got: {:?}", other),
    }
    assert!(store.tasks().await.is_empty());
    assert_eq!(
        backend.get("tasks.corrupt").await.unwrap(),
        Some("{not json".to_string())
    );

    // The next write replaces the blob but not the quarantined copy
    store.add_task("Fresh start").await.unwrap();
    assert_eq!(
        backend.get("tasks.corrupt").await.unwrap(),
        Some("{not json".to_string())
    );
}

#[tokio::test]
async fn test_corrupt_blob_without_quarantine() {
    let backend = Arc::new(MemoryBackend::with_entries([("tasks", "[{\"id\": 1}]")]));
    let config = StoreConfig {
        quarantine_corrupt: false,
        ..StoreConfig::default()
    };
    init_tracing();
    let store = TaskStore::builder(backend.clone())
        .with_config(config)
        .build();

    assert!(matches!(store.load().await, LoadOutcome::Corrupt { .. }));
    assert_eq!(backend.keys().await, vec!["tasks"]);
}

#[tokio::test]
async fn test_unreadable_backend_loads_empty() {
    let backend = Arc::new(MemoryBackend::with_entries([("tasks", "[]")]));
    let store = store_over(backend.clone());
    let mut rx = store.subscribe();

    backend.set_fail_reads(true);
    assert!(matches!(
        store.load().await,
        LoadOutcome::Unavailable { .. }
    ));
    assert!(store.tasks().await.is_empty());

    // Load still publishes what the screens should show
    let snapshot = rx.recv().await.unwrap();
    assert!(snapshot.tasks.is_empty());
}

#[tokio::test]
async fn test_legacy_blob_loads_through_store() {
    let blob = r#"[
        {"id": "1700000000000", "name": "Old style"},
        {"id": "1700000000001", "name": "With notes", "status": "W trakcie",
         "notes": [{"text": "remember", "date": "01.02.2024 10:00"}]}
    ]"#;
    let backend = Arc::new(MemoryBackend::with_entries([("tasks", blob)]));
    let store = store_over(backend.clone());

    assert_eq!(store.load().await, LoadOutcome::Loaded { count: 2 });
    let with_notes = store.get("1700000000001").await.unwrap();
    assert_eq!(with_notes.status, TaskStatus::InProgress);
    assert_eq!(with_notes.notes[0].text(), "remember");

    // Rewritten in the current shape on the next change
    store
        .set_status("1700000000000", TaskStatus::Done)
        .await
        .unwrap();
    let raw = backend.get("tasks").await.unwrap().unwrap();
    assert!(raw.contains("\"status\":\"done\""));
    assert!(raw.contains("\"content\":\"remember\""));
}

#[tokio::test]
async fn test_ids_continue_after_loaded_ones() {
    // Ids on disk are ahead of the (frozen) clock
    let ahead = frozen_clock_now().timestamp_millis() + 60_000;
    let blob = format!(r#"[{{"id": "{}", "name": "From the future"}}]"#, ahead);
    let store = store_over(Arc::new(MemoryBackend::with_entries([("tasks", blob)])));

    store.load().await;
    let task = store.add_task("Now").await.unwrap();

    assert_eq!(task.id, (ahead + 1).to_string());
}

#[tokio::test]
async fn test_note_ids_not_reused_after_restart() {
    let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new());

    let task = {
        let store = store_over(backend.clone());
        let task = store.add_task("Diary").await.unwrap();
        store
            .add_note(&task.id, NoteKind::Text, "monday")
            .await
            .unwrap();
        task
    };

    // Same frozen clock after the restart
    let store = store_over(backend);
    store.load().await;
    let other = store.add_task("Other").await.unwrap();
    let task = store
        .add_note(&task.id, NoteKind::Text, "tuesday")
        .await
        .unwrap()
        .unwrap();

    let mut ids = vec![Some(task.id.clone()), Some(other.id)];
    ids.extend(task.notes.iter().map(|n| n.id.clone()));
    assert_eq!(ids.len(), 4);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_open_uses_configured_directory() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("profile");
    let config = StoreConfig::from_lookup(|name| match name {
        "TODO_DATA_DIR" => Some(data_dir.display().to_string()),
        "TODO_TASKS_KEY" => Some("my-tasks".to_string()),
        _ => None,
    })
    .unwrap();

    init_tracing();
    let store = TaskStore::open(config);
    store.add_task("On disk").await.unwrap();

    assert!(data_dir.join("my-tasks").exists());

    let reopened = TaskStore::open(store.config().clone());
    assert_eq!(reopened.load().await, LoadOutcome::Loaded { count: 1 });
}

fn frozen_clock_now() -> chrono::DateTime<chrono::Utc> {
    use todo_core::ports::Clock;
    frozen_clock().now()
}
