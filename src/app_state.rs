use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::Config,
    infrastructure::{ObjectStorage, S3Storage},
    media_interface::MediaInterface,
};

#[derive(Clone)]
pub struct AppState {
    pub media: MediaInterface,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Incomplete storage settings leave the functions up; each call then
        // answers with a configuration error.
        let storage: Option<Arc<dyn ObjectStorage>> = match S3Storage::from_config(&config.storage) {
            Ok(storage) => {
                info!("object storage configured for region {}", config.storage.region);
                Some(Arc::new(storage))
            }
            Err(e) => {
                warn!("media functions running without object storage: {}", e);
                None
            }
        };

        Ok(Self {
            media: MediaInterface::new(storage),
            config,
        })
    }
}
