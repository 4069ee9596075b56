//! Reconciliation tests for single documents: create, update, delete and the
//! credential refresh path underneath them.

mod common;

use common::{Call, Harness, SPACE};
use sync_core::{RemoteError, RemoveOutcome, SessionError, SyncError, SyncOutcome};

#[tokio::test]
async fn test_first_sync_creates_object_and_mapping() {
    let h = Harness::new();
    let path = h.write("hello.md", "# Hello World\nbody");

    let outcome = h.engine.sync_file(&path).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Created("obj-1".into()));
    assert_eq!(h.store().get("hello").as_deref(), Some("obj-1"));
    assert_eq!(
        h.transport.object("obj-1"),
        Some(("Hello World".into(), "# Hello World\nbody".into()))
    );
}

#[tokio::test]
async fn test_resync_updates_in_place() {
    let h = Harness::new();
    let path = h.write("note.md", "# One\n");
    h.engine.sync_file(&path).await.unwrap();

    h.write("note.md", "# Two\n");
    let outcome = h.engine.sync_file(&path).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Updated("obj-1".into()));
    assert_eq!(h.transport.creates(), 1);
    assert_eq!(h.transport.object_count(), 1);
    assert_eq!(h.transport.object("obj-1").unwrap().0, "Two");
}

#[tokio::test]
async fn test_resync_recreates_missing_object() {
    let h = Harness::new();
    let path = h.write("note.md", "text");
    h.engine.sync_file(&path).await.unwrap();
    h.transport.forget_object("obj-1");

    let outcome = h.engine.sync_file(&path).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Recreated("obj-2".into()));
    assert_eq!(h.store().get("note").as_deref(), Some("obj-2"));
    assert_eq!(h.reload_store().get("note").as_deref(), Some("obj-2"));
}

#[tokio::test]
async fn test_unreadable_file_is_a_file_error() {
    let h = Harness::new();

    let err = h
        .engine
        .sync_file(&h.root().join("missing.md"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::File(_)));
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_remote_failure_leaves_mapping_untouched() {
    let h = Harness::new();
    let path = h.write("note.md", "text");
    h.transport.fail_next(RemoteError::Unavailable);

    let err = h.engine.sync_file(&path).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Session(SessionError::Remote(RemoteError::Unavailable))
    ));
    assert!(h.store().is_empty());
}

#[tokio::test]
async fn test_delete_removes_object_and_mapping() {
    let h = Harness::new();
    let path = h.write("note.md", "text");
    h.engine.sync_file(&path).await.unwrap();
    h.delete(&path);

    let outcome = h.engine.remove_file(&path).await.unwrap();

    assert_eq!(outcome, RemoveOutcome::Deleted);
    assert_eq!(h.store().get("note"), None);
    assert_eq!(h.reload_store().get("note"), None);
    assert_eq!(h.transport.object_count(), 0);
}

#[tokio::test]
async fn test_delete_of_already_gone_object_still_drops_mapping() {
    let h = Harness::new();
    let path = h.write("note.md", "text");
    h.engine.sync_file(&path).await.unwrap();
    h.transport.forget_object("obj-1");

    let outcome = h.engine.remove_file(&path).await.unwrap();

    assert_eq!(outcome, RemoveOutcome::AlreadyGone);
    assert_eq!(h.store().get("note"), None);
}

#[tokio::test]
async fn test_delete_of_untracked_file_makes_no_call() {
    let h = Harness::new();

    let outcome = h.engine.remove_file(&h.root().join("never.md")).await.unwrap();

    assert_eq!(outcome, RemoveOutcome::Untracked);
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_failed_delete_keeps_mapping() {
    let h = Harness::new();
    let path = h.write("note.md", "text");
    h.engine.sync_file(&path).await.unwrap();
    h.transport.fail_next(RemoteError::Internal("boom".into()));

    assert!(h.engine.remove_file(&path).await.is_err());
    assert_eq!(h.store().get("note").as_deref(), Some("obj-1"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_call_retried() {
    let h = Harness::new();
    h.transport.accept_only("fresh-1");
    let path = h.write("note.md", "text");

    let outcome = h.engine.sync_file(&path).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Created("obj-1".into()));
    assert_eq!(h.reauth.calls(), 1);
    assert_eq!(h.transport.creates(), 2);
}

#[tokio::test]
async fn test_second_auth_failure_inside_cooldown_is_rate_limited() {
    let h = Harness::new();
    // No token the reauthenticator produces is ever accepted.
    h.transport.accept_only("unobtainable");
    let a = h.write("a.md", "a");
    let b = h.write("b.md", "b");

    let first = h.engine.sync_file(&a).await.unwrap_err();
    let second = h.engine.sync_file(&b).await.unwrap_err();

    assert!(matches!(
        first,
        SyncError::Session(SessionError::Remote(RemoteError::Unauthenticated))
    ));
    assert!(matches!(
        second,
        SyncError::Session(SessionError::RefreshFailed { .. })
    ));
    assert_eq!(h.reauth.calls(), 1);
    // a: original + retry, b: original only.
    assert_eq!(h.transport.creates(), 3);
    assert!(h.store().is_empty());
}

#[tokio::test]
async fn test_open_container_goes_through_session() {
    let h = Harness::new();

    h.engine.session().open_container(SPACE).await.unwrap();
    h.engine.session().open_container(SPACE).await.unwrap();

    assert_eq!(
        h.transport.calls(),
        vec![Call::Open(SPACE.into()), Call::Open(SPACE.into())]
    );
}

#[tokio::test]
async fn test_unwritable_map_does_not_fail_sync() {
    let h = Harness::new();
    let path = h.write("note.md", "# Note\n");
    std::fs::create_dir(h.store().path()).unwrap();

    let outcome = h.engine.sync_file(&path).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Created("obj-1".into()));
    assert_eq!(h.store().get("note").as_deref(), Some("obj-1"));
}

#[tokio::test]
async fn test_unwritable_map_does_not_fail_delete() {
    let h = Harness::new();
    let path = h.write("note.md", "# Note\n");
    h.engine.sync_file(&path).await.unwrap();
    std::fs::remove_file(h.store().path()).unwrap();
    std::fs::create_dir(h.store().path()).unwrap();
    h.delete(&path);

    let outcome = h.engine.remove_file(&path).await.unwrap();

    assert_eq!(outcome, RemoveOutcome::Deleted);
    assert_eq!(h.store().get("note"), None);
    assert_eq!(h.transport.object_count(), 0);
}
