//! Collaborator interfaces for warden
//!
//! This crate defines the seams between the lifecycle core and the outside
//! world:
//! - [`ResourceController`]: stop, delete and emptiness checks on a
//!   provider resource
//! - [`Notifier`]: best-effort delivery of a rendered message
//!
//! Test doubles for both live in [`mock`].

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
