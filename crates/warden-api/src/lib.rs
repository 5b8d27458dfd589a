//! Shared types for warden
//!
//! This crate defines the vocabulary every other crate speaks:
//! - Resource types and confirmation statuses
//! - The persisted `ServiceRecord` and partial `RecordUpdate`s
//! - The normalized creation event handed to ingestion
//! - Outcomes of confirmation, ingestion and scheduler ticks

mod outcomes;
mod types;

pub use outcomes::*;
pub use types::*;
