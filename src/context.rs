/// Application context and dependency injection
use crate::{
    blob_store::DiskBlobStore,
    config::ServerConfig,
    diff::PixelDiffEngine,
    error::ServiceResult,
    service::ScreendiffService,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub service: Arc<ScreendiffService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ServiceResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize blob store and create namespace directories
        let store = DiskBlobStore::new(
            config.storage.uploads_directory.clone(),
            config.storage.outputs_directory.clone(),
        );
        store.ensure_directories().await?;

        tracing::info!(
            uploads = ?config.storage.uploads_directory,
            outputs = ?config.storage.outputs_directory,
            "blob_store_ready"
        );

        let service = ScreendiffService::new(Arc::new(store), Arc::new(PixelDiffEngine::new()));

        Ok(Self::with_service(config, service))
    }

    /// Build a context around an already constructed service
    pub fn with_service(config: ServerConfig, service: ScreendiffService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
