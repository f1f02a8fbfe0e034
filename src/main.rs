use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dropzone::config::Config;
use dropzone::state::AppState;
use dropzone::server::{build_api_router, build_public_router, print_startup_banner, start_servers};

// use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    // load .env file if it exists (fails silently if not found)
    let _ = dotenvy::dotenv();

    // logging first, config loading already warns
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // load configuration from environment variables
    let config = Config::from_env();

    // build tokio runtime with configured worker threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    runtime.block_on(async {
        // the store creates it lazily too, but fail loudly here if we can't
        if !config.data_dir.exists() {
            std::fs::create_dir_all(&config.data_dir).expect("Failed to create data directory");
            tracing::info!("Created data directory at: {:?}", config.data_dir);
        }

        // hydrates the live record set from the stored history
        let state = Arc::new(AppState::from_config(&config));

        let public_app = build_public_router(config.static_dir.as_deref());
        let api_app = build_api_router(state, &config);

        let public_addr = SocketAddr::from((
            config.public_host.parse::<IpAddr>()
                .expect("Invalid PUBLIC_HOST"),
            config.public_port
        ));
        let api_addr = SocketAddr::from((
            config.api_host.parse::<IpAddr>()
                .expect("Invalid API_HOST"),
            config.api_port
        ));

        print_startup_banner(&config);

        if let Err(e) = start_servers(public_app, api_app, public_addr, api_addr).await {
            tracing::error!("Failed to start servers: {}", e);
            std::process::exit(1);
        }
    });
}
