//! Audio store server binary.
//!
//! Clients upload WAV files, list them filtered by duration, read per-file
//! audio metadata and download the stored bytes. The storage directory is the
//! only source of truth; every request reads or writes it fresh.

mod app;
mod atomic;
mod audio;
mod config;
mod error;
mod filename;
mod files;
mod http;
mod locking;
mod logging;
mod storage;
mod upload;

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::app::{AppState, build_router};
use crate::audio::WavMetadataReader;
use crate::config::Args;
use crate::filename::AllowList;
use crate::http::build_cors_layer;
use crate::locking::LockManager;
use crate::storage::Storage;

/// Starts the audio store server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(&args.storage_dir)));
    storage.ensure_root().await?;

    let allow_list = AllowList::from_csv(&args.allowed_extensions);
    if allow_list.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "allowed extensions must not be empty",
        ));
    }
    info!(
        storage_dir = %storage.root_path().display(),
        extensions = ?allow_list.extensions().collect::<Vec<_>>(),
        "storage ready"
    );

    let state = AppState {
        storage,
        allow_list: Arc::new(allow_list),
        reader: Arc::new(WavMetadataReader),
        lock_manager: Arc::new(LockManager::new(Duration::from_secs(args.lock_wait_secs))),
        upload_max_size: args.upload_max_size,
    };
    let app = build_router(state, build_cors_layer(args.cors_origins.as_deref()));

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let listener = TcpListener::bind(addr).await?;

    info!("🚀 Starting HTTP server at {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
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
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
}
