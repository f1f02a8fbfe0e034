use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use sha2::{Sha256, Digest};

use crate::simulator::SimulationTuning;
use crate::uploads::DEFAULT_SHARE_DOMAIN;
use crate::validation::DEFAULT_MAX_FILE_SIZE;

/// application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// directory the key-value store writes into
    pub data_dir: PathBuf,
    /// optional directory with the presentation layer's static assets
    pub static_dir: Option<PathBuf>,
    /// public server address (static assets)
    pub public_host: String,
    /// public server port
    pub public_port: u16,
    /// json api address
    pub api_host: String,
    /// json api port
    pub api_port: u16,
    /// number of tokio worker threads
    pub worker_threads: usize,
    /// api key for authentication (hashed)
    pub api_key_hash: String,
    /// cors allowed origins (comma-separated)
    pub cors_origins: Vec<String>,
    /// rate limit: requests per minute
    pub rate_limit_per_minute: u64,
    /// domain used in generated share links
    pub share_domain: String,
    /// largest file admitted into the lifecycle
    pub max_file_size: u64,
    /// byte budget of the key-value store across all keys
    pub store_quota_bytes: usize,
    /// cap on multipart request bodies
    pub max_request_body: usize,
    /// fake network behaviour
    pub simulation: SimulationTuning,
    /// fixed seed for reproducible simulations
    pub simulation_seed: Option<u64>,
}

// parse an env var, falling back to the default when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        // get api key from env and hash it
        let api_key = std::env::var("API_KEY")
            .unwrap_or_else(|_| {
                tracing::warn!("⚠️  No API_KEY set! Using default 'changeme' - CHANGE THIS IN PRODUCTION!");
                "changeme".to_string()
            });

        let api_key_hash = Self::hash_api_key(&api_key);

        // parse cors origins
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let defaults = SimulationTuning::default();
        let min_delay_ms = env_or("SIM_MIN_DELAY_MS", defaults.min_delay.as_millis() as u64);
        let max_delay_ms = env_or("SIM_MAX_DELAY_MS", defaults.max_delay.as_millis() as u64)
            .max(min_delay_ms);
        let simulation = SimulationTuning {
            min_delay: Duration::from_millis(min_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            max_increment: env_or("SIM_MAX_INCREMENT", defaults.max_increment).max(0.0),
            failure_rate: env_or("SIM_FAILURE_RATE", defaults.failure_rate).clamp(0.0, 1.0),
            ..defaults
        };

        Self {
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            static_dir: std::env::var("STATIC_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            public_host: std::env::var("PUBLIC_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            public_port: env_or("PUBLIC_PORT", 4848),
            api_host: std::env::var("API_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env_or("API_PORT", 4849),
            worker_threads: env_or("WORKER_THREADS", 4),
            api_key_hash,
            cors_origins,
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", 120),
            share_domain: std::env::var("SHARE_DOMAIN")
                .unwrap_or_else(|_| DEFAULT_SHARE_DOMAIN.to_string()),
            max_file_size: env_or("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            store_quota_bytes: env_or("STORE_QUOTA_BYTES", 5 * 1024 * 1024),
            max_request_body: env_or("MAX_REQUEST_BODY", 128 * 1024 * 1024), // a bit over the file cap
            simulation,
            simulation_seed: std::env::var("SIM_SEED")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
        }
    }

    // hash api key using sha256
    pub fn hash_api_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }
}
