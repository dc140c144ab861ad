use std::path::Path;

use chrono::{Duration, Utc};
use tempfile::TempDir;
use tokio::fs;

use crate::{
    metadata::{self, Metadata, SIDECAR_DIR},
    sweeper,
};

async fn put_file(dir: &Path, name: &str, meta: Option<Metadata>) {
    let path = dir.join(name);
    fs::write(&path, b"content").await.unwrap();
    if let Some(meta) = meta {
        metadata::save(&path, &meta).await.unwrap();
    }
}

fn expired() -> Metadata {
    Metadata {
        expires_at: Some(Utc::now() - Duration::minutes(5)),
        password_hash: None,
    }
}

fn live() -> Metadata {
    Metadata {
        expires_at: Some(Utc::now() + Duration::hours(1)),
        password_hash: None,
    }
}

#[tokio::test]
async fn sweep_of_empty_storage_is_a_noop() {
    let storage = TempDir::new().unwrap();
    // No json/ directory exists yet at all.
    assert_eq!(sweeper::sweep(storage.path()).await.unwrap(), 0);
}

#[tokio::test]
async fn sweep_removes_only_expired_uploads() {
    let storage = TempDir::new().unwrap();
    put_file(storage.path(), "STALE.txt", Some(expired())).await;
    put_file(storage.path(), "FRESH.txt", Some(live())).await;
    put_file(storage.path(), "PLAIN.txt", None).await;

    let removed = sweeper::sweep(storage.path()).await.unwrap();
    assert_eq!(removed, 1);

    // Expired upload and its sidecar are both gone.
    assert!(!storage.path().join("STALE.txt").exists());
    assert!(!storage
        .path()
        .join(SIDECAR_DIR)
        .join("STALE.txt.json")
        .exists());

    // Everything else survives.
    assert!(storage.path().join("FRESH.txt").exists());
    assert!(storage
        .path()
        .join(SIDECAR_DIR)
        .join("FRESH.txt.json")
        .exists());
    assert!(storage.path().join("PLAIN.txt").exists());
}

#[tokio::test]
async fn corrupt_sidecar_is_skipped_not_fatal() {
    let storage = TempDir::new().unwrap();
    put_file(storage.path(), "STALE.txt", Some(expired())).await;

    let sidecar_dir = storage.path().join(SIDECAR_DIR);
    fs::write(sidecar_dir.join("BROKEN.txt.json"), b"{not json")
        .await
        .unwrap();
    fs::write(storage.path().join("BROKEN.txt"), b"content")
        .await
        .unwrap();

    // The broken sidecar is logged and skipped; the expired one still goes.
    let removed = sweeper::sweep(storage.path()).await.unwrap();
    assert_eq!(removed, 1);
    assert!(storage.path().join("BROKEN.txt").exists());
    assert!(!storage.path().join("STALE.txt").exists());
}

#[tokio::test]
async fn json_extension_uploads_sweep_cleanly() {
    let storage = TempDir::new().unwrap();
    // An upload whose own extension is .json gets a .json.json sidecar.
    put_file(storage.path(), "ABCDE.json", Some(expired())).await;
    // An unrelated protected upload shares the stem; it must survive with
    // its sidecar intact.
    put_file(
        storage.path(),
        "ABCDE",
        Some(Metadata {
            expires_at: None,
            password_hash: Some("$2b$04$fakehash".into()),
        }),
    )
    .await;

    let removed = sweeper::sweep(storage.path()).await.unwrap();
    assert_eq!(removed, 1);

    assert!(!storage.path().join("ABCDE.json").exists());
    assert!(!storage
        .path()
        .join(SIDECAR_DIR)
        .join("ABCDE.json.json")
        .exists());

    assert!(storage.path().join("ABCDE").exists());
    assert!(storage.path().join(SIDECAR_DIR).join("ABCDE.json").exists());
}

#[tokio::test]
async fn sweep_tolerates_an_already_deleted_file() {
    let storage = TempDir::new().unwrap();
    put_file(storage.path(), "STALE.txt", Some(expired())).await;
    // Someone else removed the content but left the sidecar behind.
    fs::remove_file(storage.path().join("STALE.txt")).await.unwrap();

    let removed = sweeper::sweep(storage.path()).await.unwrap();
    assert_eq!(removed, 1);
    assert!(!storage
        .path()
        .join(SIDECAR_DIR)
        .join("STALE.txt.json")
        .exists());
}
