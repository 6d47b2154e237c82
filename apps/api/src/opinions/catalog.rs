//! Model Catalog: the process-wide list of models the provider can serve.
//!
//! The snapshot is an immutable `Arc` swapped under a short `RwLock` write.
//! Readers only clone the `Arc`. A separate async mutex keeps refreshes
//! single-writer so concurrent refreshes do not stampede the provider.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::llm_client::{ProviderError, TextProvider};
use crate::models::catalog::{static_fallback_snapshot, ModelCatalogSnapshot};

pub struct ModelCatalog {
    provider: Arc<dyn TextProvider>,
    snapshot: RwLock<Option<Arc<ModelCatalogSnapshot>>>,
    refresh_guard: Mutex<()>,
}

impl ModelCatalog {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self {
            provider,
            snapshot: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Fetches the model list and installs it as the current snapshot.
    ///
    /// On failure the previous snapshot is kept; with no previous snapshot the
    /// static fallback is installed and flagged as degraded.
    pub async fn refresh(&self) -> Arc<ModelCatalogSnapshot> {
        let _writer = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    /// Returns the cached snapshot, refreshing once if nothing is cached yet.
    ///
    /// Callers that queue behind an in-flight refresh reuse its result.
    pub async fn current(&self) -> Arc<ModelCatalogSnapshot> {
        if let Some(snapshot) = self.cached() {
            return snapshot;
        }
        let _writer = self.refresh_guard.lock().await;
        match self.cached() {
            Some(snapshot) => snapshot,
            None => self.refresh_locked().await,
        }
    }

    /// Caller must hold `refresh_guard`.
    async fn refresh_locked(&self) -> Arc<ModelCatalogSnapshot> {
        match self.fetch().await {
            Ok(snapshot) => {
                info!("Model catalog refreshed: {} models", snapshot.models.len());
                let snapshot = Arc::new(snapshot);
                self.store(snapshot.clone());
                snapshot
            }
            Err(e) => match self.cached() {
                Some(previous) => {
                    warn!("Model catalog refresh failed, keeping previous snapshot: {e}");
                    previous
                }
                None => {
                    warn!("Model catalog refresh failed, using static fallback: {e}");
                    let fallback = Arc::new(static_fallback_snapshot());
                    self.store(fallback.clone());
                    fallback
                }
            },
        }
    }

    fn cached(&self) -> Option<Arc<ModelCatalogSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store(&self, snapshot: Arc<ModelCatalogSnapshot>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot);
    }

    async fn fetch(&self) -> Result<ModelCatalogSnapshot, ProviderError> {
        let models = self.provider.list_models().await?;
        if models.is_empty() {
            return Err(ProviderError::transient(
                "provider listed no generation models",
            ));
        }
        Ok(ModelCatalogSnapshot::new(models))
    }
}
