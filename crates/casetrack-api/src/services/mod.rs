pub mod cases;
pub mod identity;
pub mod ingestion;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use cases::{CaseListing, CaseService};
pub use identity::{
    AuthSession, GoTrueIdentityProvider, IdentityProvider, IdentityUser, SessionEvent,
};
pub use ingestion::{MediaIngestionService, ReceivedFile, UploadBatch};
pub use upload::dedup::{DedupCache, InMemoryDedupCache};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision every store keeps (microseconds).
pub(crate) fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
