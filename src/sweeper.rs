use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::{fs, sync::watch, time};

use crate::metadata::{self, Metadata, SIDECAR_DIR};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Run the expiration sweeper on its own task: once right away, then every
/// half hour until shutdown. Requests never wait on this loop; the only
/// shared resource is the filesystem, and deletes on both sides tolerate
/// the other having won the race.
pub fn spawn(storage_dir: PathBuf, mut shutdown: watch::Receiver<()>) {
    tokio::spawn(async move {
        let mut ticker = time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(why) = sweep(&storage_dir).await {
                        tracing::error!("sweep failed: {why:?}");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    });
}

/// Scan every sidecar under `<storage>/json/` and delete expired uploads
/// together with their sidecars. One unreadable or corrupt sidecar is
/// logged and skipped; it never aborts the rest of the sweep. Returns the
/// number of uploads removed.
pub async fn sweep(storage_dir: &Path) -> std::io::Result<usize> {
    let sidecar_dir = storage_dir.join(SIDECAR_DIR);

    let mut entries = match fs::read_dir(&sidecar_dir).await {
        Ok(entries) => entries,
        // No sidecars yet means nothing can be expired.
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    tracing::info!("running background sweep for expired files");
    let mut deleted = 0;

    while let Some(entry) = entries.next_entry().await? {
        let sidecar = entry.path();
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(true) {
            continue;
        }

        let meta: Metadata = match fs::read(&sidecar).await {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(meta) => meta,
                Err(why) => {
                    tracing::error!("skipping corrupt sidecar {}: {why}", sidecar.display());
                    continue;
                }
            },
            Err(why) => {
                tracing::error!("failed to read sidecar {}: {why}", sidecar.display());
                continue;
            }
        };

        if !meta.is_expired() {
            continue;
        }

        // `<storage>/json/ABCDE.txt.json` -> `<storage>/ABCDE.txt`. Only
        // the final `.json` belongs to the sidecar; the rest is the
        // upload's own name, which may itself end in `.json`.
        let entry_name = entry.file_name();
        let Some(file_name) = entry_name.to_string_lossy().strip_suffix(".json").map(str::to_string)
        else {
            tracing::warn!("stray non-sidecar file {}", sidecar.display());
            continue;
        };
        let file_path = storage_dir.join(&file_name);

        tracing::info!("file expired, removing {}", file_path.display());
        if let Err(why) = metadata::delete_with_sidecar(&file_path).await {
            tracing::error!("failed to remove expired upload {file_name}: {why:?}");
            continue;
        }
        deleted += 1;
    }

    tracing::info!("sweep finished, removed {deleted} expired uploads");
    Ok(deleted)
}
