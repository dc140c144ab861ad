use std::path::{Path, PathBuf};

use axum::http::HeaderMap;
use nanoid::nanoid;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    metadata::SIDECAR_DIR,
};

pub fn friendly_id(len: usize) -> String {
    nanoid!(len)
}

/// Reduce a user-supplied file parameter to a plain base name. Anything
/// that could walk out of the storage dir is rejected outright, along with
/// the sidecar dir itself and dot names (in-flight `.tmp-*` spools).
pub fn sanitize_name(raw: &str) -> AppResult<String> {
    if raw.is_empty() || raw.starts_with('.') || raw == SIDECAR_DIR {
        return Err(AppError::InvalidFileName);
    }
    if raw.contains('/') || raw.contains('\\') || raw.contains('\0') {
        return Err(AppError::InvalidFileName);
    }
    Ok(raw.to_string())
}

pub fn content_path(cfg: &Config, name: &str) -> PathBuf {
    Path::new(&cfg.general.storage_dir).join(name)
}

/// Public link for an upload. Scheme follows `X-Forwarded-Proto` so links
/// come out right behind a TLS-terminating proxy.
pub fn public_url(headers: &HeaderMap, cfg: &Config, name: &str) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{proto}://{}/{name}", cfg.general.base_url)
}
