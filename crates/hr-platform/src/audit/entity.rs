//! Audit Log Entity
//!
//! One entry per committed write, stored in the same transaction as the
//! write itself.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::entity::PrincipalKind;
use crate::shared::tsid::TsidGenerator;
use crate::usecase::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    /// Secret changed by its owner
    SecretRotated,
    /// Reset token issued
    ResetRequested,
    /// Secret replaced through a reset token
    SecretReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    #[serde(rename = "_id")]
    pub id: String,

    /// Principal kind affected, e.g. "Employee"
    pub entity_type: String,

    pub entity_id: String,

    pub action: AuditAction,

    /// Use case name, e.g. "create_principal"
    pub operation: String,

    /// Who performed the action; "system" for bootstrap writes
    pub principal_id: String,

    pub execution_id: String,

    pub correlation_id: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub performed_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn record(
        ctx: &ExecutionContext,
        kind: PrincipalKind,
        entity_id: impl Into<String>,
        action: AuditAction,
        operation: &str,
    ) -> Self {
        Self {
            id: TsidGenerator::generate(),
            entity_type: kind.label().to_string(),
            entity_id: entity_id.into(),
            action,
            operation: operation.to_string(),
            principal_id: ctx.principal_id.clone(),
            execution_id: ctx.execution_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
            performed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_copies_context() {
        let ctx = ExecutionContext::with_correlation("actor-1", "req-9");
        let entry = AuditLog::record(
            &ctx,
            PrincipalKind::Employee,
            "emp-1",
            AuditAction::Create,
            "create_principal",
        );

        assert_eq!(entry.entity_type, "Employee");
        assert_eq!(entry.principal_id, "actor-1");
        assert_eq!(entry.execution_id, ctx.execution_id);
        assert_eq!(entry.correlation_id, "req-9");
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&AuditAction::SecretRotated).unwrap();
        assert_eq!(json, "\"SECRET_ROTATED\"");
    }
}
