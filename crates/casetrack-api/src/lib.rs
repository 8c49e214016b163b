//! Casetrack API Library
//!
//! HTTP handlers, services and application setup for the case-tracking API.

mod api_doc;
mod handlers;
mod middleware;
mod telemetry;

pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use handlers::cases::DEGRADED_HEADER;
pub use middleware::request_id::{RequestId, REQUEST_ID_HEADER};
pub use telemetry::init_tracing;
