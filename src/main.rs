mod auth;
mod config;
mod delete;
mod download;
mod errors;
mod identity;
mod instrumentation;
mod listing;
mod metadata;
mod sessions;
mod sweeper;
#[cfg(test)]
mod tests;
mod upload;
mod utilities;
mod view;

#[cfg(not(unix))]
use std::future;
use std::{
    env,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use tokio::{fs, net::TcpListener, signal, sync::watch};
use tower_http::limit::RequestBodyLimitLayer;

use crate::{config::Config, errors::AppResult, sessions::SessionStore};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    /// Name of the most recent upload in this process, for `GET /last`.
    pub last_uploaded: Arc<RwLock<Option<String>>>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            last_uploaded: Arc::new(RwLock::new(None)),
        }
    }
}

fn router(ctx: AppContext) -> Router {
    let router = Router::new()
        .route("/upload", post(upload::upload_endpoint))
        .route("/paste", post(upload::paste_endpoint))
        .route("/token", get(listing::token_endpoint))
        .route("/tree", get(listing::tree_endpoint))
        .route("/last", get(listing::last_endpoint))
        .route("/raw/:file", get(download::raw_endpoint))
        .route(
            "/:file",
            get(view::view_endpoint)
                .post(view::password_endpoint)
                .delete(delete::delete_endpoint),
        )
        .layer((
            DefaultBodyLimit::disable(),
            RequestBodyLimitLayer::new(1024 * 1024 * 1024 + 1024),
            Extension(ctx),
        ));

    instrumentation::add_layer(router)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let config_path =
        env::var("PASTEDROP_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    // Missing or incomplete credentials abort here, before we bind.
    let cfg = config::load_config(&config_path).await?;

    instrumentation::setup(&cfg.instrumentation.directives)?;

    let storage_dir = PathBuf::from(&cfg.general.storage_dir);
    fs::create_dir_all(storage_dir.join(metadata::SIDECAR_DIR)).await?;

    let ctx = AppContext::new(cfg);

    let (shutdown_tx, _) = watch::channel(());
    sweeper::spawn(storage_dir, shutdown_tx.subscribe());
    ctx.sessions.spawn_reaper(shutdown_tx.subscribe());

    let bind_address = ctx.config.general.bind_address.clone();
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("pastedrop is available on http://{bind_address}");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the sweeper and session reaper; in-flight iterations finish.
    let _ = shutdown_tx.send(());

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
