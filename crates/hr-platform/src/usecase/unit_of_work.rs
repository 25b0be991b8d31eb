//! Unit of Work
//!
//! Runs one write as a single bounded transaction: begin, the caller's
//! steps (uniqueness check, mutation, audit entry), then commit. Any
//! error or an expired deadline aborts the transaction. Nothing is
//! retried.
//!
//! ```ignore
//! self.unit_of_work
//!     .execute("create_principal", move |session| {
//!         Box::pin(async move {
//!             if session.exists_conflict(&probe).await? {
//!                 return Err(UseCaseError::identity_conflict());
//!             }
//!             session.insert(&principal).await?;
//!             Ok(principal)
//!         })
//!     })
//!     .await
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, warn};

use super::error::{UseCaseError, STORAGE_FAILURE_MESSAGE};
use super::result::UseCaseResult;
use crate::principal::directory::{Directory, DirectorySession};

/// Upper bound on an abort, which may run after the deadline has passed.
const ABORT_GRACE: Duration = Duration::from_secs(1);

pub struct UnitOfWork<D: Directory> {
    directory: Arc<D>,
    timeout: Duration,
}

impl<D: Directory> Clone for UnitOfWork<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            timeout: self.timeout,
        }
    }
}

impl<D: Directory> UnitOfWork<D> {
    /// `timeout` bounds the whole transaction, commit included.
    pub fn new(directory: Arc<D>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Execute `work` inside a transaction and commit it.
    ///
    /// This is the only way a write use case produces a success.
    pub async fn execute<T, F>(&self, operation: &'static str, work: F) -> UseCaseResult<T>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut D::Session) -> BoxFuture<'s, Result<T, UseCaseError>> + Send,
    {
        let deadline = Instant::now() + self.timeout;

        let mut session = match timeout_at(deadline, self.directory.begin()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                error!(operation, error = %e, "Failed to begin transaction");
                return UseCaseResult::failure(UseCaseError::storage(
                    "TRANSACTION_BEGIN_FAILED",
                    STORAGE_FAILURE_MESSAGE,
                ));
            }
            Err(_) => return UseCaseResult::failure(Self::timed_out(operation)),
        };

        let outcome = match timeout_at(deadline, work(&mut session)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Self::timed_out(operation)),
        };

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                // A session dropped mid-abort is discarded server-side.
                match timeout(ABORT_GRACE, session.abort()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(abort_err)) => {
                        warn!(operation, error = %abort_err, "Failed to abort transaction")
                    }
                    Err(_) => warn!(operation, "Abort did not finish in time, dropping session"),
                }
                debug!(operation, code = err.code(), "Transaction aborted");
                return UseCaseResult::failure(err);
            }
        };

        // On commit timeout the dropped session aborts server-side.
        match timeout_at(deadline, session.commit()).await {
            Ok(Ok(())) => {
                debug!(operation, "Transaction committed");
                UseCaseResult::success(value)
            }
            Ok(Err(e)) => {
                let err = UseCaseError::from(e);
                if matches!(err, UseCaseError::StorageError { .. }) {
                    error!(operation, error = %err, "Transaction commit failed");
                } else {
                    warn!(operation, code = err.code(), "Transaction rejected at commit");
                }
                UseCaseResult::failure(err)
            }
            Err(_) => UseCaseResult::failure(Self::timed_out(operation)),
        }
    }

    fn timed_out(operation: &'static str) -> UseCaseError {
        error!(operation, "Transaction did not complete within its deadline");
        UseCaseError::storage(
            "TRANSACTION_TIMEOUT",
            "Transaction did not complete in time",
        )
    }
}
