use crate::auth::TokenService;
use crate::config::Config;
use crate::error::Result;
use crate::storage::FileStorage;
use std::sync::Arc;

/// Common context for all handler operations
pub struct HandlerContext {
    pub config: Config,
    pub storage: Arc<FileStorage>,
}

impl HandlerContext {
    /// Open the configured data directory, creating it if needed
    pub async fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(config.storage.data_dir.clone()));
        storage.ensure_directories().await?;
        tracing::debug!(data_dir = %storage.root().display(), "Storage ready");
        Ok(Self { config, storage })
    }

    /// Token service built from the auth section
    #[must_use]
    pub fn tokens(&self) -> TokenService {
        TokenService::new(&self.config.auth.jwt_secret, self.config.auth.token_ttl_hours)
    }
}
