//! Shared infrastructure: errors, ids, indexes, HTTP plumbing.

pub mod api_common;
pub mod error;
pub mod indexes;
pub mod middleware;
pub mod tsid;
