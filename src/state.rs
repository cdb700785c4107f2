use crate::config::AppConfig;
use crate::errors::AppError;
use crate::storage::{Store, StoreError};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Runs `work` against a connection opened for this call only. The
    /// connection lives on a blocking worker and is closed when `work` returns.
    pub async fn with_store<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.config.db_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let store = Store::open(&path)?;
            work(&store)
        })
        .await?;
        Ok(result?)
    }
}
