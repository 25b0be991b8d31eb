//! Execution Context
//!
//! Who performs a use case and which request it belongs to. Written into
//! audit entries and attached to log spans.

use chrono::{DateTime, Utc};

use crate::shared::tsid::TsidGenerator;

/// Principal id recorded for writes not triggered by a request.
pub const SYSTEM_PRINCIPAL: &str = "system";

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    /// Shared by all executions serving one inbound request
    pub correlation_id: String,
    pub principal_id: String,
    pub initiated_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Fresh context for a request; correlation starts as the execution id.
    pub fn create(principal_id: impl Into<String>) -> Self {
        let exec_id = format!("exec-{}", TsidGenerator::generate());
        Self {
            execution_id: exec_id.clone(),
            correlation_id: exec_id,
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }

    /// Context for startup tasks such as the bootstrap account.
    pub fn system() -> Self {
        Self::create(SYSTEM_PRINCIPAL)
    }

    /// Context continuing an upstream correlation id (e.g. `x-request-id`).
    pub fn with_correlation(
        principal_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: format!("exec-{}", TsidGenerator::generate()),
            correlation_id: correlation_id.into(),
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }
}
