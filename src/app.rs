//! 路由组装：路径、共享状态与中间件。

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::audio::MetadataReader;
use crate::filename::AllowList;
use crate::files;
use crate::http::{add_security_headers, client_ip};
use crate::locking::LockManager;
use crate::storage::Storage;
use crate::upload;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub allow_list: Arc<AllowList>,
    pub reader: Arc<dyn MetadataReader>,
    pub lock_manager: Arc<LockManager>,
    /// Max upload request size in bytes, 0 disables the limit.
    pub upload_max_size: u64,
}

pub fn build_router(state: AppState, cors_layer: Option<CorsLayer>) -> Router {
    let body_limit = match usize::try_from(state.upload_max_size) {
        Ok(0) | Err(_) => DefaultBodyLimit::disable(),
        Ok(limit) => DefaultBodyLimit::max(limit),
    };
    let upload_route = post(upload::upload_file).layer(body_limit);

    let mut app = Router::new()
        .route("/upload/", upload_route.clone())
        .route("/upload", upload_route)
        .route("/list/", get(files::list_files))
        .route("/list", get(files::list_files))
        .route("/info/", get(files::file_info))
        .route("/info", get(files::file_info))
        .route("/download/", get(files::download_file))
        .route("/download", get(files::download_file))
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip = %client_ip(request),
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(Extension(state.storage))
        .layer(Extension(state.allow_list))
        .layer(Extension(state.reader))
        .layer(Extension(state.lock_manager));

    if let Some(cors_layer) = cors_layer {
        app = app.layer(cors_layer);
    }
    app
}
