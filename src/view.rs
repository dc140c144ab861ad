use axum::{
    extract::Path,
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tokio::fs;

use crate::{
    auth::{self, ItemAccess},
    errors::{AppError, AppResult},
    metadata, sessions,
    utilities::{content_path, sanitize_name},
    AppContext,
};

/// View page for an upload: authorized requests are bounced to the raw
/// content, protected ones get a minimal password prompt. The prompt is
/// identical whether the password is wrong or the item does not exist.
pub async fn view_endpoint(
    ctx: Extension<AppContext>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let name = sanitize_name(&file)?;
    let path = content_path(&ctx.config, &name);

    let meta = metadata::read(&path).await?;
    if meta.is_expired() {
        if let Err(why) = metadata::delete_with_sidecar(&path).await {
            tracing::error!("failed to remove expired upload {name}: {why:?}");
        }
        return Err(AppError::FileNotFound);
    }

    match auth::check_item_access(&meta, &headers, &ctx.sessions, &name) {
        ItemAccess::Authorized => {
            if !fs::try_exists(&path).await? {
                return Err(AppError::FileNotFound);
            }
            Ok(Redirect::to(&format!("/raw/{name}")).into_response())
        }
        ItemAccess::NeedsPassword => Ok(password_prompt(&name, false)),
    }
}

/// Password submission for a protected upload. Success mints a session
/// bound to this one file, sets it as a cookie and redirects back.
pub async fn password_endpoint(
    ctx: Extension<AppContext>,
    Path(file): Path<String>,
    Form(form): Form<PasswordForm>,
) -> AppResult<Response> {
    let name = sanitize_name(&file)?;
    let path = content_path(&ctx.config, &name);

    let meta = metadata::read(&path).await?;
    if meta.is_expired() {
        if let Err(why) = metadata::delete_with_sidecar(&path).await {
            tracing::error!("failed to remove expired upload {name}: {why:?}");
        }
        return Err(AppError::FileNotFound);
    }

    let Some(hash) = meta.password_hash.as_deref() else {
        // Not protected (or never existed); the view path sorts it out.
        return Ok(Redirect::to(&format!("/{name}")).into_response());
    };

    if !metadata::verify_password(&form.password, hash).await? {
        tracing::warn!("wrong password for {name}");
        return Ok(password_prompt(&name, true));
    }

    let token = ctx.sessions.create(&name);
    let response = Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(LOCATION, format!("/{name}"))
        .header(SET_COOKIE, sessions::session_cookie(&token))
        .body(axum::body::Body::empty())
        .expect("static response construction");
    Ok(response)
}

#[derive(Deserialize)]
pub struct PasswordForm {
    pub password: String,
}

fn password_prompt(name: &str, failed: bool) -> Response {
    let notice = if failed {
        "<p>Wrong password, try again.</p>"
    } else {
        ""
    };
    let page = format!(
        "<!doctype html><html><body>\
         <h1>This file is password protected</h1>{notice}\
         <form method=\"post\" action=\"/{name}\">\
         <input type=\"password\" name=\"password\" autofocus>\
         <button type=\"submit\">Unlock</button>\
         </form></body></html>"
    );
    (StatusCode::UNAUTHORIZED, Html(page)).into_response()
}
