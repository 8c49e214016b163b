//! Test helpers: build the router over the in-memory store and a temporary
//! uploads directory.
//!
//! Run from workspace root: `cargo test -p casetrack-api`.

pub mod fixtures;
pub mod offline_store;

use axum_test::TestServer;
use casetrack_api::setup::routes::setup_routes;
use casetrack_api::setup::services::build_state;
use casetrack_core::{CasetrackConfig, Config, UploadConfig};
use casetrack_db::{CaseStore, InMemoryCaseStore};
use casetrack_storage::{LocalStorage, StorageChain};
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server and the directory backing local storage.
pub struct TestApp {
    pub server: TestServer,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of files currently in the uploads directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.uploads.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn test_config(uploads: &TempDir) -> Config {
    Config::new(CasetrackConfig {
        uploads: UploadConfig {
            dir: uploads.path().to_path_buf(),
            ..UploadConfig::default()
        },
        ..CasetrackConfig::default()
    })
}

/// Setup test app with an empty record store and local-only storage.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_store(Arc::new(InMemoryCaseStore::new())).await
}

/// Setup test app over the given record store.
pub async fn setup_test_app_with_store(store: Arc<dyn CaseStore>) -> TestApp {
    let uploads = TempDir::new().expect("Failed to create uploads dir");
    let config = test_config(&uploads);

    let local = LocalStorage::new(uploads.path(), "/uploads")
        .await
        .expect("Failed to create local storage");
    let state = build_state(
        config.clone(),
        store,
        StorageChain::local_only(Arc::new(local)),
        None,
    );

    let router = setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, uploads }
}
