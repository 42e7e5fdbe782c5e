//! Integration tests for single-object downloads

use std::sync::Arc;
use std::time::Duration;

use blazesync_core::domain::{parse_wire_timestamp, reconcile, SyncKey};
use blazesync_sync::filesystem::LocalFileSystemAdapter;
use blazesync_sync::transfer::temp_path_for;
use blazesync_sync::TransferError;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use crate::common::{self, RecordingObserver, ServerResolver, REMOTE_TIME};

fn mtime(path: &std::path::Path) -> DateTime<Utc> {
    std::fs::metadata(path).unwrap().modified().unwrap().into()
}

// ============================================================================
// Successful downloads
// ============================================================================

#[tokio::test]
async fn test_download_publishes_content_and_remote_mtime() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_file(&server, "docs/report.txt", b"quarterly numbers").await;

    let object = common::object("docs/report.txt", 17);
    let report = common::engine(Duration::from_secs(10))
        .download(
            &object,
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .expect("download failed");

    let final_path = root.path().join("docs").join("report.txt");
    assert_eq!(report.path, final_path);
    assert_eq!(report.bytes, 17);
    assert_eq!(std::fs::read(&final_path).unwrap(), b"quarterly numbers");
    assert!(!temp_path_for(&final_path).exists());
    assert_eq!(mtime(&final_path), parse_wire_timestamp(REMOTE_TIME).unwrap());
}

#[tokio::test]
async fn test_downloaded_file_reconciles_as_up_to_date() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_file(&server, "a.txt", b"abc").await;

    let object = common::object("a.txt", 3);
    common::engine(Duration::from_secs(10))
        .download(
            &object,
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let local = LocalFileSystemAdapter::new().scan(root.path()).await.unwrap();
    let result = reconcile(&[object.clone()], &local.files);
    assert!(result.missing.is_empty());
    assert!(result.unsynced.is_empty());
    assert_eq!(result.up_to_date, vec![object.key]);
}

#[tokio::test]
async fn test_download_empty_object() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_file(&server, "empty.bin", b"").await;

    let report = common::engine(Duration::from_secs(10))
        .download(
            &common::object("empty.bin", 0),
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.bytes, 0);
    assert_eq!(std::fs::read(root.path().join("empty.bin")).unwrap(), b"");
}

#[tokio::test]
async fn test_progress_events_follow_content_length() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let body: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
    common::mount_file(&server, "big.bin", &body).await;

    let observer = Arc::new(RecordingObserver::default());
    let engine = common::engine(Duration::from_secs(10)).with_observer(observer.clone());
    engine
        .download(
            &common::object("big.bin", body.len() as u64),
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let events = observer.events();
    assert_eq!(events.first().unwrap(), "started big.bin Some(200000)");
    assert_eq!(events.last().unwrap(), "finished big.bin");
    let advanced: u64 = events
        .iter()
        .filter_map(|e| e.strip_prefix("advanced big.bin "))
        .map(|n| n.parse::<u64>().unwrap())
        .sum();
    assert_eq!(advanced, 200_000);
}

#[tokio::test]
async fn test_existing_temp_file_is_replaced() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_file(&server, "a.txt", b"fresh").await;
    let final_path = root.path().join("a.txt");
    std::fs::write(temp_path_for(&final_path), b"stale partial content").unwrap();

    common::engine(Duration::from_secs(10))
        .download(
            &common::object("a.txt", 5),
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(std::fs::read(&final_path).unwrap(), b"fresh");
    assert!(!temp_path_for(&final_path).exists());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_rejected_download_leaves_no_file_and_stays_missing() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_status(&server, "gone.txt", 403).await;

    let observer = Arc::new(RecordingObserver::default());
    let object = common::object("gone.txt", 10);
    let err = common::engine(Duration::from_secs(10))
        .with_observer(observer.clone())
        .download(
            &object,
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::RemoteRejected { status: 403 }));
    let final_path = root.path().join("gone.txt");
    assert!(!final_path.exists());
    assert!(!temp_path_for(&final_path).exists());
    assert_eq!(observer.events(), vec!["failed gone.txt".to_string()]);

    let local = LocalFileSystemAdapter::new().scan(root.path()).await.unwrap();
    let result = reconcile(&[object.clone()], &local.files);
    assert_eq!(result.missing, vec![object]);
}

#[tokio::test]
async fn test_deadline_elapses_and_temp_is_removed() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_slow_file(&server, "slow.bin", b"late", Duration::from_secs(5)).await;

    let err = common::engine(Duration::from_millis(200))
        .download(
            &common::object("slow.bin", 4),
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::TimedOut { .. }));
    let final_path = root.path().join("slow.bin");
    assert!(!final_path.exists());
    assert!(!temp_path_for(&final_path).exists());
}

#[tokio::test]
async fn test_cancellation_during_transfer_removes_temp() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_slow_file(&server, "movie.mkv", b"frames", Duration::from_millis(500)).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = common::engine(Duration::from_secs(10))
        .download(
            &common::object("movie.mkv", 6),
            root.path(),
            &ServerResolver::new(&server),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Cancelled));
    let final_path = root.path().join("movie.mkv");
    assert!(!final_path.exists());
    assert!(!temp_path_for(&final_path).exists());
}

#[tokio::test]
async fn test_publish_onto_directory_fails_cleanly() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_file(&server, "taken", b"content").await;
    std::fs::create_dir_all(root.path().join("taken").join("child")).unwrap();

    let err = common::engine(Duration::from_secs(10))
        .download(
            &common::object("taken", 7),
            root.path(),
            &ServerResolver::new(&server),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::PublishFailed { .. }));
    assert!(root.path().join("taken").is_dir());
    assert!(!temp_path_for(&root.path().join("taken")).exists());
}

#[tokio::test]
async fn test_same_key_cannot_download_twice_at_once() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    common::mount_slow_file(&server, "dup.txt", b"once", Duration::from_millis(300)).await;

    let engine = common::engine(Duration::from_secs(10));
    let resolver = ServerResolver::new(&server);
    let cancel = CancellationToken::new();
    let object = common::object("dup.txt", 4);

    let (first, second) = tokio::join!(
        engine.download(&object, root.path(), &resolver, &cancel),
        engine.download(&object, root.path(), &resolver, &cancel),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(TransferError::AlreadyInFlight)))
            .count(),
        1
    );
    assert!(!engine.is_in_flight(&SyncKey::from_remote("dup.txt").unwrap()));
}
