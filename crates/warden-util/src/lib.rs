//! Shared utilities for warden
//!
//! This crate provides:
//! - ID types (ServiceId, TickId)
//! - Clocks (system clock with mock time, manual clock for tests)
//! - The daily enforcement window predicate
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
