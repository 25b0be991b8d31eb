//! Delete Principal Use Case
//!
//! Hard delete. Records referencing the principal are left in place.

use tracing::info;

use super::principal_not_found;
use crate::audit::{AuditAction, AuditLog};
use crate::principal::directory::{Directory, DirectorySession};
use crate::principal::entity::PrincipalKind;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone)]
pub struct DeletePrincipalCommand {
    pub kind: PrincipalKind,
    pub id: String,
}

pub struct DeletePrincipalUseCase<D: Directory> {
    unit_of_work: UnitOfWork<D>,
}

impl<D: Directory> DeletePrincipalUseCase<D> {
    pub fn new(unit_of_work: UnitOfWork<D>) -> Self {
        Self { unit_of_work }
    }

    pub async fn execute(
        &self,
        command: DeletePrincipalCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<()> {
        let DeletePrincipalCommand { kind, id } = command;

        if id.trim().is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "PRINCIPAL_ID_REQUIRED",
                "Principal ID is required",
            ));
        }

        let principal_id = id.clone();
        let result = self
            .unit_of_work
            .execute("delete_principal", move |session| {
                Box::pin(async move {
                    if !session.delete(kind, &id).await? {
                        return Err(principal_not_found(kind, &id));
                    }
                    session
                        .record_audit(&AuditLog::record(
                            &ctx,
                            kind,
                            &id,
                            AuditAction::Delete,
                            "delete_principal",
                        ))
                        .await?;
                    Ok(())
                })
            })
            .await;

        if result.is_success() {
            info!(principal_id = %principal_id, kind = %kind, "Principal deleted");
        }
        result
    }
}
