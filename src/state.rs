use std::sync::Arc;

use crate::config::Config;
use crate::kv::{FileKv, KvStore};
use crate::random::{RandomSource, SeededRandom};
use crate::uploads::UploadService;
use crate::validation::UploadPolicy;

/// shared application state
#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadService,
}

impl AppState {
    pub fn new(uploads: UploadService) -> Self {
        Self { uploads }
    }

    /// wire the upload service to the on-disk store described by `config`
    pub fn from_config(config: &Config) -> Self {
        let kv: Arc<dyn KvStore> = Arc::new(FileKv::new(config.data_dir.clone(), config.store_quota_bytes));

        let random: Arc<dyn RandomSource> = match config.simulation_seed {
            Some(seed) => {
                tracing::info!("Using fixed simulation seed {}", seed);
                Arc::new(SeededRandom::from_seed(seed))
            }
            None => Arc::new(SeededRandom::from_entropy()),
        };

        let uploads = UploadService::builder(kv)
            .policy(UploadPolicy::new(config.max_file_size))
            .tuning(config.simulation.clone())
            .share_domain(config.share_domain.clone())
            .random(random)
            .build();

        Self::new(uploads)
    }
}
