/// Application context and dependency injection
use crate::{
    blob_store::{BlobStore, BlobStoreConfig},
    config::ServerConfig,
    error::{RelayError, RelayResult},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub blob_store: Arc<BlobStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> RelayResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize blob store
        let blob_store = BlobStore::new(BlobStoreConfig {
            root: config.storage.upload_directory.clone(),
            max_upload_size: config.storage.max_upload_size,
        });

        // Nothing is uploading yet, so every temp file is an orphan
        let removed = blob_store.backend().sweep_temp_files().await?;
        if removed > 0 {
            tracing::warn!(removed, "Removed orphaned temp uploads from a previous run");
        }

        Ok(Self {
            config: Arc::new(config),
            blob_store: Arc::new(blob_store),
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> RelayResult<()> {
        let dir = &config.storage.upload_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                RelayError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        match &self.config.service.public_url {
            Some(url) => url.clone(),
            None => format!(
                "http://{}:{}",
                self.config.service.hostname, self.config.service.port
            ),
        }
    }
}
