use axum::{
    body::Body,
    extract::Path,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap,
    },
    response::IntoResponse,
    Extension,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{
    auth::{self, ItemAccess},
    errors::{AppError, AppResult},
    metadata,
    utilities::{content_path, sanitize_name},
    AppContext,
};

/// Serve the stored bytes of an upload. Password-protected items need a
/// valid session; expired items are deleted on the spot and reported as
/// missing (the sweeper may have beaten us to it, which is fine).
pub async fn raw_endpoint(
    ctx: Extension<AppContext>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let name = sanitize_name(&file)?;
    let path = content_path(&ctx.config, &name);

    let meta = metadata::read(&path).await?;
    if meta.is_expired() {
        if let Err(why) = metadata::delete_with_sidecar(&path).await {
            tracing::error!("failed to remove expired upload {name}: {why:?}");
        }
        return Err(AppError::FileNotFound);
    }

    if auth::check_item_access(&meta, &headers, &ctx.sessions, &name) != ItemAccess::Authorized {
        return Err(AppError::PasswordRequired);
    }

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::FileNotFound)
        }
        Err(err) => return Err(err.into()),
    };

    // Binary types are sniffed from magic bytes; everything else (pastes,
    // source files, logs) is assumed to be text.
    let mime = infer::get_from_path(&path)
        .ok()
        .flatten()
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "text/plain; charset=utf-8".to_string());

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Ok((
        [
            (CONTENT_TYPE, mime),
            (
                CONTENT_DISPOSITION,
                format!(r#"inline; filename="{name}""#),
            ),
        ],
        body,
    ))
}
