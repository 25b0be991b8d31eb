//! Use Case Infrastructure
//!
//! - [`UseCaseError`]: classified failures with an HTTP status hint
//! - [`UseCaseResult`]: sealed result, success only through [`UnitOfWork`]
//! - [`ExecutionContext`]: who is acting, for audit and tracing
//! - [`UnitOfWork`]: one bounded transaction per write

pub mod error;
pub mod execution_context;
pub mod result;
pub mod unit_of_work;

pub use error::{UseCaseError, IDENTITY_CONFLICT_MESSAGE, STORAGE_FAILURE_MESSAGE};
pub use execution_context::ExecutionContext;
pub use result::UseCaseResult;
pub use unit_of_work::UnitOfWork;
