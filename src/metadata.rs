use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, task};

use crate::errors::{AppError, AppResult};

/// Subdirectory of the storage dir that holds metadata sidecars.
pub const SIDECAR_DIR: &str = "json";

/// Optional per-upload settings, stored as a JSON sidecar next to the
/// content file (`<storage>/json/<name>.json`). A missing sidecar means
/// "never expires, no password" and is the common case; one is only
/// written when an upload asks for expiry or password protection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl Metadata {
    pub fn is_default(&self) -> bool {
        self.expires_at.is_none() && self.password_hash.is_none()
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at <= Utc::now())
    }
}

/// Sidecar location for a content file: sibling `json/` dir, same base
/// name plus `.json`.
pub fn sidecar_path(file_path: &Path) -> PathBuf {
    let dir = file_path.parent().unwrap_or_else(|| Path::new(""));
    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(SIDECAR_DIR).join(format!("{name}.json"))
}

/// Write (or overwrite) the sidecar for `file_path`.
pub async fn save(file_path: &Path, meta: &Metadata) -> AppResult<()> {
    let json_path = sidecar_path(file_path);
    let dir = json_path.parent().expect("sidecar path has a parent");

    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating metadata directory {}", dir.display()))?;

    let data = serde_json::to_vec_pretty(meta).context("serializing metadata")?;
    fs::write(&json_path, data)
        .await
        .with_context(|| format!("writing metadata file {}", json_path.display()))?;

    Ok(())
}

/// Read the sidecar for `file_path`. A missing sidecar yields the default
/// metadata; an unreadable or malformed one is a hard error for this item.
pub async fn read(file_path: &Path) -> AppResult<Metadata> {
    let json_path = sidecar_path(file_path);

    let data = match fs::read(&json_path).await {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Metadata::default()),
        Err(err) => {
            return Err(AppError::Other(anyhow::Error::new(err).context(format!(
                "reading metadata file {}",
                json_path.display()
            ))))
        }
    };

    let meta = serde_json::from_slice(&data)
        .with_context(|| format!("parsing metadata file {}", json_path.display()))?;
    Ok(meta)
}

/// Remove the sidecar for `file_path`; already-missing is not an error.
pub async fn remove(file_path: &Path) -> AppResult<()> {
    let json_path = sidecar_path(file_path);
    match fs::remove_file(&json_path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Delete a content file together with its sidecar. Both the sweeper and
/// the lazy on-fetch expiry path call this, so "already gone" must count
/// as success on both halves.
pub async fn delete_with_sidecar(file_path: &Path) -> AppResult<()> {
    match fs::remove_file(file_path).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    remove(file_path).await
}

/// Parse a user-supplied expiration like `30m`, `1h30m`, `2h`, `45s` or
/// `7d` into an absolute timestamp. Empty input means no expiration.
pub fn parse_expiration(input: &str) -> AppResult<Option<DateTime<Utc>>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let seconds = parse_duration_secs(input).ok_or(AppError::InvalidExpiration)?;
    if seconds <= 0 {
        return Err(AppError::InvalidExpiration);
    }
    Ok(Some(Utc::now() + Duration::seconds(seconds)))
}

fn parse_duration_secs(input: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut number = String::new();
    let mut saw_segment = false;

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let value: i64 = number.parse().ok()?;
        number.clear();
        let unit = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86_400,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(unit)?)?;
        saw_segment = true;
    }

    if !number.is_empty() || !saw_segment {
        return None;
    }
    Some(total)
}

/// Bcrypt-hash a per-file password on a blocking worker; empty input means
/// no protection. The plaintext is never stored or logged.
pub async fn hash_password(plaintext: &str) -> AppResult<Option<String>> {
    if plaintext.is_empty() {
        return Ok(None);
    }
    let plaintext = plaintext.to_owned();
    let hash = task::spawn_blocking(move || bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)).await??;
    Ok(Some(hash))
}

/// Verify a submitted password against a stored bcrypt hash. Malformed
/// hashes count as a failed match rather than an error, so callers leak
/// nothing about the stored state.
pub async fn verify_password(plaintext: &str, hash: &str) -> AppResult<bool> {
    let plaintext = plaintext.to_owned();
    let hash = hash.to_owned();
    let matched =
        task::spawn_blocking(move || bcrypt::verify(plaintext, &hash).unwrap_or(false)).await?;
    Ok(matched)
}
