//! Audit Log
//!
//! Append-only record of writes. Entries are produced by use cases and
//! persisted through the directory session of the surrounding transaction.

pub mod entity;

pub use entity::{AuditAction, AuditLog};
