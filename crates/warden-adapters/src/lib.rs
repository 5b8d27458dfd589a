//! Adapters that connect warden to real infrastructure
//!
//! - [`CommandController`]: runs configured argv templates to stop, delete
//!   or inspect resources
//! - [`WebhookNotifier`]: POSTs rendered notifications as JSON
//! - [`LogNotifier`]: writes notifications to the log

mod command;
mod notify;

pub use command::*;
pub use notify::*;
