//! Service initialization and application state setup

use crate::services::identity::spawn_session_logger;
use crate::services::ingestion::UploadLimits;
use crate::services::{
    CaseService, GoTrueIdentityProvider, IdentityProvider, InMemoryDedupCache,
    MediaIngestionService,
};
use crate::state::AppState;
use anyhow::{Context, Result};
use casetrack_core::Config;
use casetrack_db::CaseStore;
use casetrack_storage::{build_storage_chain, outbound_client, StorageChain};
use std::sync::Arc;
use std::time::Duration;

/// Wire services over an already chosen store and storage chain.
pub fn build_state(
    config: Config,
    store: Arc<dyn CaseStore>,
    storage: StorageChain,
    identity: Option<Arc<dyn IdentityProvider>>,
) -> Arc<AppState> {
    let uploads = config.uploads();
    let dedup = Arc::new(InMemoryDedupCache::new(Duration::from_secs(
        uploads.dedup_window_secs,
    )));
    let limits = UploadLimits::from(uploads);

    Arc::new(AppState {
        cases: CaseService::new(store.clone(), storage.clone()),
        ingestion: MediaIngestionService::new(store.clone(), storage.clone(), dedup, limits),
        identity,
        store,
        storage,
        config,
    })
}

fn setup_identity(config: &Config) -> Result<Option<Arc<dyn IdentityProvider>>> {
    let Some(identity) = config.identity() else {
        tracing::info!("IDENTITY_URL not set; auth endpoints disabled");
        return Ok(None);
    };

    let client = outbound_client(config.outbound_timeout_secs())
        .context("Failed to build identity HTTP client")?;
    let provider = GoTrueIdentityProvider::new(client, identity);
    spawn_session_logger(provider.subscribe());

    tracing::info!(url = %identity.url, "Identity provider configured");
    let provider: Arc<dyn IdentityProvider> = Arc::new(provider);
    Ok(Some(provider))
}

/// Build the store, storage chain and identity adapter from configuration.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let store = super::database::setup_store(config).await?;

    #[cfg(feature = "storage-object")]
    casetrack_storage::provision_object_storage(config).await;

    let storage = build_storage_chain(config)
        .await
        .context("Failed to initialize storage")?;
    let identity = setup_identity(config)?;

    tracing::info!(store = store.kind(), "Services initialized");
    Ok(build_state(config.clone(), store, storage, identity))
}
