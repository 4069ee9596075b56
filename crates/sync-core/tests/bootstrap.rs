//! Startup sweep tests, including the full bootstrap-then-delete scenario.

mod common;

use common::{Call, Harness};
use std::sync::Arc;
use sync_core::{
    BootstrapReport, Dispatch, Dispatcher, FsEvent, FsEventKind, RemoteError, SyncSettings,
    initial_sync,
};

#[tokio::test(start_paused = true)]
async fn test_bootstrap_then_delete() {
    let h = Harness::new();
    h.write("a.md", "# A\nx");
    let b = h.write("b.md", "no heading");
    h.write("c.md", "# C\ny");

    let report = initial_sync(&h.root(), &h.engine, &SyncSettings::default())
        .await
        .unwrap();

    assert_eq!(report, BootstrapReport { synced: 3, failed: 0 });
    let mapping = h.reload_store().snapshot();
    assert_eq!(mapping.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
    assert_eq!(h.transport.object(&mapping["a"]).unwrap().0, "A");
    assert_eq!(h.transport.object(&mapping["b"]).unwrap().0, "b");
    assert_eq!(h.transport.object(&mapping["c"]).unwrap().0, "C");

    let b_id = mapping["b"].clone();
    h.delete(&b);
    let mut dispatcher = Dispatcher::new(Arc::clone(&h.engine), SyncSettings::default());
    let result = dispatcher.handle(FsEvent::new(&b, FsEventKind::Remove)).await;

    assert_eq!(result, Dispatch::Removed);
    assert!(h.transport.calls().contains(&Call::Delete(vec![b_id])));
    let mapping = h.reload_store().snapshot();
    assert_eq!(mapping.keys().collect::<Vec<_>>(), ["a", "c"]);
}

#[tokio::test]
async fn test_one_failure_does_not_abort_the_sweep() {
    let h = Harness::new();
    h.write("a.md", "a");
    h.write("b.md", "b");
    h.write("c.md", "c");
    h.transport.fail_next(RemoteError::Timeout);

    let report = initial_sync(&h.root(), &h.engine, &SyncSettings::default())
        .await
        .unwrap();

    assert_eq!(report, BootstrapReport { synced: 2, failed: 1 });
    assert_eq!(h.store().get("a"), None);
    assert!(h.store().get("b").is_some());
    assert!(h.store().get("c").is_some());
}

#[tokio::test]
async fn test_flat_sweep_skips_subdirectories_and_other_files() {
    let h = Harness::new();
    h.write("top.md", "top");
    h.write("notes.txt", "ignored");
    h.write(".hidden.md", "ignored");
    h.write("sub/nested.md", "nested");

    let report = initial_sync(&h.root(), &h.engine, &SyncSettings::default())
        .await
        .unwrap();

    assert_eq!(report.synced, 1);
    assert!(h.store().get("top").is_some());
    assert_eq!(h.store().get("nested"), None);
}

#[tokio::test]
async fn test_recursive_sweep_descends() {
    let h = Harness::new();
    h.write("top.md", "top");
    h.write("sub/nested.md", "nested");
    h.write("sub/deeper/leaf.md", "leaf");
    h.write(".git/ignored.md", "ignored");
    let settings = SyncSettings {
        recursive: true,
        ..SyncSettings::default()
    };

    let report = initial_sync(&h.root(), &h.engine, &settings).await.unwrap();

    assert_eq!(report.synced, 3);
    assert!(h.store().get("leaf").is_some());
    assert_eq!(h.store().get("ignored"), None);
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let h = Harness::new();

    let err = initial_sync(
        &h.root().join("does-not-exist"),
        &h.engine,
        &SyncSettings::default(),
    )
    .await
    .unwrap_err();

    assert!(err.path.ends_with("does-not-exist"));
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_disconnected_session_counts_every_file_as_failed() {
    let h = Harness::new();
    h.write("a.md", "a");
    h.write("b.md", "b");
    let engine = sync_core::SyncEngine::new(
        Arc::new(sync_core::Session::disconnected()),
        Arc::new(h.reload_store()),
        common::SPACE,
    );

    let report = initial_sync(&h.root(), &engine, &SyncSettings::default())
        .await
        .unwrap();

    assert_eq!(report, BootstrapReport { synced: 0, failed: 2 });
}
