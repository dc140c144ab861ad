use std::path::PathBuf;

use axum::{
    extract::{multipart::Field, Multipart},
    http::{header::LOCATION, HeaderMap},
    response::{IntoResponse, Redirect},
    Extension, Form,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    auth,
    config::{Config, NamingMode},
    errors::{AppError, AppResult},
    identity::{self, ContentDigest},
    metadata::{self, Metadata},
    utilities::{content_path, friendly_id, public_url},
    AppContext,
};

/// Multipart upload (`curl -F file=@...`), gated by the `X-Auth` header.
/// Optional companion fields: `secret` (full-length name), `expires`
/// (duration string) and `password`.
pub async fn upload_endpoint(
    ctx: Extension<AppContext>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    if !auth::check_upload_auth(&headers, &ctx.config.auth.upload_key) {
        tracing::warn!("unauthorized upload attempt");
        return Err(AppError::Unauthorized);
    }

    let mut spooled: Option<Spooled> = None;
    let mut secret = false;
    let mut expires = String::new();
    let mut password = String::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let original = field
                    .file_name()
                    .ok_or(AppError::InvalidFileName)?
                    .to_string();
                if original.is_empty() {
                    return Err(AppError::InvalidFileName);
                }
                let extension = identity::extension_of(&original);
                spooled = Some(spool_field(&ctx.config, field, extension).await?);
            }
            Some("secret") => secret = true,
            Some("expires") => expires = field.text().await?,
            Some("password") => password = field.text().await?,
            _ => continue,
        }
    }

    let spooled = spooled.ok_or(AppError::EmptyUpload)?;
    let name = match finalize(&ctx, &spooled, secret, &expires, &password).await {
        Ok(name) => name,
        Err(err) => {
            let _ = fs::remove_file(&spooled.tmp_path).await;
            return Err(err);
        }
    };

    let url = public_url(&headers, &ctx.config, &name);
    Ok(([(LOCATION, url.clone())], format!("{url}\n")))
}

/// Browser paste form (urlencoded), gated by basic auth unless
/// `require_auth` is off. Pastes are always stored as `.txt`.
pub async fn paste_endpoint(
    ctx: Extension<AppContext>,
    headers: HeaderMap,
    Form(form): Form<PasteForm>,
) -> AppResult<impl IntoResponse> {
    if ctx.config.auth.require_auth && !auth::check_basic_auth(&headers, &ctx.config.auth) {
        return Err(AppError::BasicAuthRequired);
    }

    if form.content.is_empty() {
        return Err(AppError::EmptyUpload);
    }
    let normalized = form.content.replace("\r\n", "\n");

    let spooled = spool_bytes(&ctx.config, normalized.as_bytes(), ".txt".to_string()).await?;
    let name = match finalize(
        &ctx,
        &spooled,
        form.secret.is_some(),
        form.expires.as_deref().unwrap_or(""),
        form.password.as_deref().unwrap_or(""),
    )
    .await
    {
        Ok(name) => name,
        Err(err) => {
            let _ = fs::remove_file(&spooled.tmp_path).await;
            return Err(err);
        }
    };

    Ok(Redirect::to(&format!("/{name}")))
}

#[derive(Deserialize)]
pub struct PasteForm {
    pub content: String,
    pub secret: Option<String>,
    pub expires: Option<String>,
    pub password: Option<String>,
}

/// An upload spooled to a temp file in the storage dir, digest already
/// computed. Spooling first means the final name (which depends on the
/// digest) is only ever created by a rename, so readers never observe a
/// half-written file.
struct Spooled {
    tmp_path: PathBuf,
    digest: String,
    extension: String,
}

async fn spool_field(cfg: &Config, mut field: Field<'_>, extension: String) -> AppResult<Spooled> {
    let tmp_path = content_path(cfg, &format!(".tmp-{}", friendly_id(12)));
    let mut file = fs::File::create(&tmp_path).await?;
    let mut digest = ContentDigest::new();

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err.into());
            }
        };
        digest.update(&chunk);
        if let Err(err) = file.write_all(&chunk).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
    }
    if let Err(err) = file.flush().await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }

    Ok(Spooled {
        tmp_path,
        digest: digest.finish(),
        extension,
    })
}

async fn spool_bytes(cfg: &Config, bytes: &[u8], extension: String) -> AppResult<Spooled> {
    let tmp_path = content_path(cfg, &format!(".tmp-{}", friendly_id(12)));
    if let Err(err) = fs::write(&tmp_path, bytes).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }

    Ok(Spooled {
        tmp_path,
        digest: identity::digest(bytes),
        extension,
    })
}

/// Name the spooled file, move it into place and attach metadata. A
/// metadata write failure is logged but does not fail the upload; the item
/// simply stays unprotected and non-expiring.
async fn finalize(
    ctx: &AppContext,
    spooled: &Spooled,
    secret: bool,
    expires: &str,
    password: &str,
) -> AppResult<String> {
    let expires_at = lenient_expiration(expires);
    let password_hash = metadata::hash_password(password).await?;

    let name = match ctx.config.general.naming {
        NamingMode::Hash => identity::name_from(&spooled.digest, &spooled.extension, secret),
        NamingMode::Random => identity::random_name(&spooled.extension, secret),
    };
    let final_path = content_path(&ctx.config, &name);

    // Last writer wins on name collisions; that is the accepted overwrite
    // semantics of short-hash naming.
    fs::rename(&spooled.tmp_path, &final_path).await?;

    let meta = Metadata {
        expires_at,
        password_hash,
    };
    if !meta.is_default() {
        if let Err(why) = metadata::save(&final_path, &meta).await {
            tracing::error!("failed to save metadata for {name}: {why:?}");
        }
    }

    *ctx.last_uploaded.write().expect("last upload lock poisoned") = Some(name.clone());
    tracing::info!("stored upload {name}");
    Ok(name)
}

fn lenient_expiration(expires: &str) -> Option<DateTime<Utc>> {
    match metadata::parse_expiration(expires) {
        Ok(value) => value,
        Err(why) => {
            tracing::warn!("ignoring unparseable expiration {expires:?}: {why}");
            None
        }
    }
}
