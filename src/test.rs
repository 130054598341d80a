//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{Client, TestBackend, TokenCell, Transport, DEMO_EMAIL, DEMO_PASSWORD};
use crate::session::{MemoryStorage, Session};
use crate::store::{DataStore, StoreOptions};
use crate::Config;
use std::sync::Arc;
use tempfile::TempDir;

/// A session and a data store wired to a seeded in-memory backend.
pub(crate) struct TestEnv {
    pub(crate) backend: Arc<TestBackend>,
    pub(crate) storage: Arc<MemoryStorage>,
    pub(crate) client: Client,
    pub(crate) session: Arc<Session>,
    pub(crate) store: Arc<DataStore>,
}

impl TestEnv {
    /// Nobody is signed in and the session has not been initialized.
    pub(crate) fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub(crate) fn with_options(options: StoreOptions) -> Self {
        let backend = Arc::new(TestBackend::default());
        let storage = Arc::new(MemoryStorage::new());
        let client = Client::new(Transport::new(backend.clone(), TokenCell::new()));
        let session = Arc::new(Session::new(client.clone(), storage.clone()));
        let store = Arc::new(DataStore::new(client.clone(), session.clone(), options));
        Self {
            backend,
            storage,
            client,
            session,
            store,
        }
    }

    /// Signed in as the demo user. Nothing is loaded yet.
    pub(crate) async fn signed_in() -> Self {
        Self::signed_in_with(StoreOptions::default()).await
    }

    pub(crate) async fn signed_in_with(options: StoreOptions) -> Self {
        let env = Self::with_options(options);
        env.session
            .login(DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        env
    }

    /// Signed in as the demo user with the seed data loaded.
    pub(crate) async fn loaded() -> Self {
        let env = Self::signed_in().await;
        env.store.refresh_all().await.unwrap();
        env
    }
}

/// A budgetzen home directory in a temporary directory. In `Mode::Test` the commands keep the
/// state of the in-memory backend in it, so separate commands see each other's changes.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub(crate) struct TestHome {
    _temp_dir: TempDir,
    config: Config,
}

impl TestHome {
    pub(crate) async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("budgetzen");
        let config = Config::create(&root, "http://localhost:8000/api")
            .await
            .unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }
}
