use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

use crate::{
    auth,
    errors::{AppError, AppResult},
    metadata::SIDECAR_DIR,
    AppContext,
};

/// Basic-auth gated JSON listing of all stored uploads, newest first.
pub async fn tree_endpoint(
    ctx: Extension<AppContext>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<FileEntry>>> {
    if !auth::check_basic_auth(&headers, &ctx.config.auth) {
        return Err(AppError::BasicAuthRequired);
    }

    let mut entries = Vec::new();
    let mut dir = fs::read_dir(&ctx.config.general.storage_dir).await?;

    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // `json/` holds sidecars and `.tmp-*` are in-flight spools.
        if name == SIDECAR_DIR || name.starts_with('.') {
            continue;
        }
        let info = match entry.metadata().await {
            Ok(info) if info.is_file() => info,
            Ok(_) => continue,
            Err(why) => {
                tracing::warn!("failed to stat {name}: {why}");
                continue;
            }
        };
        let modified = info
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        entries.push(FileEntry {
            name,
            bytes: info.len(),
            modified,
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(Json(entries))
}

/// Redirect to whatever was uploaded most recently in this process.
pub async fn last_endpoint(
    ctx: Extension<AppContext>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    if !auth::check_basic_auth(&headers, &ctx.config.auth) {
        return Err(AppError::BasicAuthRequired);
    }

    let last = ctx
        .last_uploaded
        .read()
        .expect("last upload lock poisoned")
        .clone();
    match last {
        Some(name) => Ok(Redirect::to(&format!("/{name}"))),
        None => Err(AppError::FileNotFound),
    }
}

/// Exchange basic-auth credentials for a short-lived upload token.
pub async fn token_endpoint(
    ctx: Extension<AppContext>,
    headers: HeaderMap,
) -> AppResult<String> {
    if !auth::check_basic_auth(&headers, &ctx.config.auth) {
        return Err(AppError::BasicAuthRequired);
    }

    auth::issue_token(&ctx.config.auth.upload_key)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub bytes: u64,
    pub modified: DateTime<Utc>,
}
