//! Shared runtime utilities for HR Platform binaries.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
