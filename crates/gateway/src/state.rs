//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::GatewayConfig;
use crate::storage::{ObjectStore, StorageError};
use crate::store::SnapshotStore;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("object store: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and the snapshot store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    backend: BackendClient,
    store: SnapshotStore<BackendClient>,
    objects: ObjectStore,
}

impl AppState {
    /// Create a new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients fail to build.
    pub fn new(config: GatewayConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let store = SnapshotStore::new(backend.clone(), config.store_staleness);
        let objects = ObjectStore::new(&config.storage)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                store,
                objects,
            }),
        })
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the Data Service client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the shared snapshot store.
    #[must_use]
    pub fn store(&self) -> &SnapshotStore<BackendClient> {
        &self.inner.store
    }

    /// Get a reference to the object store client.
    #[must_use]
    pub fn objects(&self) -> &ObjectStore {
        &self.inner.objects
    }
}
