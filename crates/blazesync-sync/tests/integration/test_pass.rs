//! Integration tests for whole sync passes

use blazesync_core::domain::{ReconcileIssue, SyncSettings, SyncStatus};
use blazesync_core::ports::{FixedConfirmation, ILastSyncStore};
use blazesync_sync::engine::{PassOutcome, PassSummary, SyncRequest};
use tempfile::TempDir;
use wiremock::MockServer;

use crate::common;

fn request(root: &TempDir) -> SyncRequest {
    SyncRequest {
        sync_root: Some(root.path().to_path_buf()),
        settings: SyncSettings::default(),
    }
}

fn completed(outcome: PassOutcome) -> PassSummary {
    match outcome {
        PassOutcome::Completed(summary) => summary,
        PassOutcome::Skipped(reason) => panic!("pass skipped: {reason:?}"),
    }
}

#[tokio::test]
async fn test_first_pass_downloads_everything_but_placeholders() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    common::mount_file(&server, "a.txt", b"alpha").await;
    common::mount_file(&server, "photos/2024/b.jpg", b"jpeg-bytes").await;

    let objects = vec![
        common::object("a.txt", 5),
        common::object("photos/2024/b.jpg", 10),
        common::object("photos/.blazed-placeholder", 0),
    ];
    let (orchestrator, store) = common::orchestrator(&server, objects, state.path());

    let summary = completed(
        orchestrator
            .run_sync(request(&root), &FixedConfirmation(true))
            .await
            .unwrap(),
    );

    assert!(summary.confirmed);
    assert_eq!(summary.preview.missing_count, 2);
    assert_eq!(summary.preview.missing_bytes, 15);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.bytes_downloaded, 15);
    assert!(summary.failures.is_empty());
    assert_eq!(std::fs::read(root.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(
        std::fs::read(root.path().join("photos").join("2024").join("b.jpg")).unwrap(),
        b"jpeg-bytes"
    );
    assert!(!root.path().join("photos").join(".blazed-placeholder").exists());
    assert_eq!(orchestrator.status(), SyncStatus::Synced);
    assert!(store.last_sync().await.unwrap().is_some());
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    common::mount_file(&server, "a.txt", b"alpha").await;

    let (orchestrator, _store) =
        common::orchestrator(&server, vec![common::object("a.txt", 5)], state.path());

    completed(
        orchestrator
            .run_sync(request(&root), &FixedConfirmation(true))
            .await
            .unwrap(),
    );
    let second = completed(
        orchestrator
            .run_sync(request(&root), &FixedConfirmation(true))
            .await
            .unwrap(),
    );

    assert_eq!(second.preview.missing_count, 0);
    assert_eq!(second.preview.unsynced_count, 0);
    assert_eq!(second.preview.up_to_date_count, 1);
    assert!(!second.confirmed);
    assert_eq!(second.downloaded, 0);
}

#[tokio::test]
async fn test_failed_object_does_not_stop_the_others() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    common::mount_file(&server, "ok-1.txt", b"one").await;
    common::mount_status(&server, "broken.txt", 500).await;
    common::mount_file(&server, "ok-2.txt", b"two").await;

    let objects = vec![
        common::object("ok-1.txt", 3),
        common::object("broken.txt", 6),
        common::object("ok-2.txt", 3),
    ];
    let (orchestrator, _store) = common::orchestrator(&server, objects, state.path());

    let summary = completed(
        orchestrator
            .run_sync(request(&root), &FixedConfirmation(true))
            .await
            .unwrap(),
    );

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].key.as_str(), "broken.txt");
    assert!(summary.failures[0].error.contains("500"));
    assert!(!root.path().join("broken.txt").exists());
    assert_eq!(orchestrator.status(), SyncStatus::Synced);

    // The failed object is still missing next time
    let preview = orchestrator
        .preview(root.path(), &SyncSettings::default())
        .await
        .unwrap();
    assert_eq!(preview.preview.missing_count, 1);
    assert_eq!(preview.reconciliation.missing[0].key.as_str(), "broken.txt");
}

#[tokio::test]
async fn test_pass_cleans_leftover_temp_files() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt.blazesync-part"), b"half").unwrap();
    common::mount_file(&server, "a.txt", b"whole").await;

    let (orchestrator, _store) =
        common::orchestrator(&server, vec![common::object("a.txt", 5)], state.path());

    let summary = completed(
        orchestrator
            .run_sync(request(&root), &FixedConfirmation(true))
            .await
            .unwrap(),
    );

    assert_eq!(summary.removed_temp_files, 1);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(std::fs::read(root.path().join("a.txt")).unwrap(), b"whole");
    assert!(!root.path().join("a.txt.blazesync-part").exists());
}

#[tokio::test]
async fn test_remote_key_with_temp_suffix_is_skipped_every_pass() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    common::mount_file(&server, "notes.txt", b"notes").await;
    common::mount_file(&server, "notes.txt.blazesync-part", b"draft").await;

    let objects = vec![
        common::object("notes.txt", 5),
        common::object("notes.txt.blazesync-part", 5),
    ];
    let (orchestrator, _store) = common::orchestrator(&server, objects, state.path());

    for _ in 0..2 {
        let summary = completed(
            orchestrator
                .run_sync(request(&root), &FixedConfirmation(true))
                .await
                .unwrap(),
        );
        assert_eq!(summary.removed_temp_files, 0);
        assert!(summary
            .issues
            .iter()
            .any(|issue| matches!(issue, ReconcileIssue::ReservedName { key }
                if key.as_str() == "notes.txt.blazesync-part")));
    }

    let preview = orchestrator
        .preview(root.path(), &SyncSettings::default())
        .await
        .unwrap();
    assert_eq!(preview.preview.missing_count, 0);
    assert_eq!(std::fs::read(root.path().join("notes.txt")).unwrap(), b"notes");
    assert!(!root.path().join("notes.txt.blazesync-part").exists());
}

#[tokio::test]
async fn test_local_only_files_are_reported_not_touched() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    std::fs::write(root.path().join("draft.md"), b"local work").unwrap();

    let (orchestrator, _store) = common::orchestrator(&server, Vec::new(), state.path());

    let summary = completed(
        orchestrator
            .run_sync(request(&root), &FixedConfirmation(true))
            .await
            .unwrap(),
    );

    assert_eq!(summary.preview.unsynced_count, 1);
    assert_eq!(summary.preview.unsynced_bytes, 10);
    assert!(summary
        .notes
        .iter()
        .any(|n| n.contains("upload_unsynced_files")));
    assert_eq!(
        std::fs::read(root.path().join("draft.md")).unwrap(),
        b"local work"
    );
}
