//! Application state shared by every handler.

use crate::services::{CaseService, IdentityProvider, MediaIngestionService};
use casetrack_core::Config;
use casetrack_db::CaseStore;
use casetrack_storage::StorageChain;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cases: CaseService,
    pub ingestion: MediaIngestionService,
    /// `None` when no identity service is configured
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub store: Arc<dyn CaseStore>,
    pub storage: StorageChain,
}
