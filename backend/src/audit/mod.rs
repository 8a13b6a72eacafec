//! Audit trail
//!
//! Every mutation writes one [`AuditEntry`] inside the same transaction as
//! the change it describes.

mod model;
mod service;

pub use model::{AuditEntry, AuditQuery, NewAuditEntry};
pub use service::{record, AuditService};
