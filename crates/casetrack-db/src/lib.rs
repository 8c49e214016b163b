//! Record store for cases and their media
//!
//! [`CaseStore`] is the persistence seam. [`InMemoryCaseStore`] backs
//! development and tests; [`PgCaseStore`] persists to Postgres using the
//! migrations in the workspace `migrations/` directory.

pub mod store;

pub use store::{CaseStore, InMemoryCaseStore, PgCaseStore, MIGRATOR};
