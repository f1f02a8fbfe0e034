use axum::{
    Router,
    routing::{get, post},
    Extension,
};
use tower_http::{
    services::ServeDir,
    trace::TraceLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    cors::{AllowOrigin, CorsLayer},
};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::handlers::{
    admit_files, admit_multipart, batch_delete_uploads, delete_session, delete_upload,
    get_current_session, get_session, get_summary, get_upload, health_check, list_sessions,
    list_uploads, publish_session, retry_upload,
};
use crate::middleware::{add_security_headers, require_api_key, ApiKeyHash};
use crate::state::AppState;
use crate::utils::shutdown_signal;
use crate::config::Config;

// build public router: the presentation layer's static assets, if any
pub fn build_public_router(static_dir: Option<&Path>) -> Router {
    let router = match static_dir {
        Some(dir) => {
            tracing::debug!("Serving presentation assets from {:?}", dir);
            Router::new().fallback_service(
                ServeDir::new(dir)
                    .append_index_html_on_directories(true)
                    .precompressed_gzip()
                    .precompressed_br()
            )
        }
        None => Router::new().route("/", get(|| async { "dropzone api is on the api port" })),
    };

    router
        .layer(axum::middleware::from_fn(add_security_headers))
        .layer(CompressionLayer::new()
            .gzip(true)
            .br(true)
            .zstd(true)
        )
        .layer(TraceLayer::new_for_http())
}

/// api routes with key check and state, no transport layers
pub fn api_routes(state: Arc<AppState>, api_key_hash: String) -> Router {
    let protected = Router::new()
        .route("/api/uploads", post(admit_files).get(list_uploads))
        // file bodies are only counted, the outer RequestBodyLimitLayer caps them
        .route(
            "/api/uploads/multipart",
            post(admit_multipart).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/uploads/:id", get(get_upload).delete(delete_upload))
        .route("/api/uploads/:id/retry", post(retry_upload))
        .route("/api/batch-delete", post(batch_delete_uploads))
        .route("/api/summary", get(get_summary))
        .route("/api/session", get(get_current_session))
        .route("/api/sessions", post(publish_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .layer(axum::middleware::from_fn(require_api_key))
        .layer(Extension(ApiKeyHash(api_key_hash)));

    Router::new()
        .route("/api/health", get(health_check))
        .merge(protected)
        .layer(axum::middleware::from_fn(add_security_headers))
        .with_state(state)
}

/// build api router
pub fn build_api_router(state: Arc<AppState>, config: &Config) -> Router {
    tracing::debug!("Building api router with max request body: {} bytes", config.max_request_body);

    // one token every 60_000 / rpm ms, with a burst of a few seconds' worth
    let rate = config.rate_limit_per_minute.max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond((60_000 / rate).max(1))
            .burst_size((rate / 12).clamp(5, u32::MAX as u64) as u32)
            .finish()
            .expect("rate limit period and burst are non-zero"),
    );

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_origin(AllowOrigin::list(origins))
        .allow_headers(tower_http::cors::Any);

    api_routes(state, config.api_key_hash.clone())
        .layer(RequestBodyLimitLayer::new(config.max_request_body))
        .layer(GovernorLayer { config: governor_conf })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start both public and api servers
pub async fn start_servers(
    public_app: Router,
    api_app: Router,
    public_addr: SocketAddr,
    api_addr: SocketAddr,
) -> std::io::Result<()> {
    tracing::info!("Starting servers...");

    let public_listener = tokio::net::TcpListener::bind(public_addr).await?;
    let api_listener = tokio::net::TcpListener::bind(api_addr).await?;

    tracing::debug!("Public listener bound to {}", public_addr);
    tracing::debug!("API listener bound to {}", api_addr);

    let public_server = axum::serve(
        public_listener,
        public_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .tcp_nodelay(true);

    let api_server = axum::serve(
        api_listener,
        api_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .tcp_nodelay(true);

    tracing::info!("Servers running and ready to accept connections");
    let _ = tokio::join!(
        async {
            if let Err(e) = public_server.await {
                tracing::error!("Public server error: {}", e);
            }
        },
        async {
            if let Err(e) = api_server.await {
                tracing::error!("API server error: {}", e);
            }
        }
    );
    Ok(())
}

/// print startup banner with server info
pub fn print_startup_banner(config: &Config) {
    tracing::info!("dropzone starting...");
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("📡 PUBLIC SERVER: http://{}:{}", config.public_host, config.public_port);
    tracing::info!("🔐 API SERVER: http://{}:{}", config.api_host, config.api_port);
    tracing::info!("💾 Upload history in: {:?}", config.data_dir.canonicalize().unwrap_or(config.data_dir.clone()));
    tracing::info!("🔗 Share links on: https://{}", config.share_domain);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
