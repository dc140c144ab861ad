use axum::{extract::Path, http::HeaderMap, http::StatusCode, Extension};

use crate::{
    auth,
    errors::{AppError, AppResult},
    metadata,
    utilities::{content_path, sanitize_name},
    AppContext,
};

/// Remove an upload and its sidecar. Idempotent: deleting something that
/// is already gone (possibly raced by the sweeper) still succeeds.
pub async fn delete_endpoint(
    ctx: Extension<AppContext>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    if !auth::check_upload_auth(&headers, &ctx.config.auth.upload_key) {
        tracing::warn!("unauthorized delete attempt");
        return Err(AppError::Unauthorized);
    }

    let name = sanitize_name(&file)?;
    let path = content_path(&ctx.config, &name);
    metadata::delete_with_sidecar(&path).await?;

    tracing::info!("deleted upload {name}");
    Ok(StatusCode::NO_CONTENT)
}
