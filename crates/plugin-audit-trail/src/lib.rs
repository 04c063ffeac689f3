//! # plugin-audit-trail
//!
//! Records hiring events (job, candidate, and interview hooks) into the
//! host's plugin storage so they can be reviewed later.

pub mod entry;
pub mod hooks;
pub mod plugin;

pub use entry::{AuditEntry, read_entries};
pub use plugin::{AuditTrailPlugin, PLUGIN_ID};
