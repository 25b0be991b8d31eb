//! Create Principal Use Case

use std::sync::Arc;
use tracing::info;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::credential_service::CredentialService;
use crate::principal::directory::{Directory, DirectorySession};
use crate::principal::entity::{Principal, PrincipalKind};
use crate::principal::fields::{PrincipalFields, SecretChange};
use crate::principal::uniqueness::{UniquenessOracle, UniquenessProbe};
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone)]
pub struct CreatePrincipalCommand {
    pub kind: PrincipalKind,
    pub fields: PrincipalFields,
}

pub struct CreatePrincipalUseCase<D: Directory> {
    unit_of_work: UnitOfWork<D>,
    credentials: Arc<CredentialService>,
}

impl<D: Directory> CreatePrincipalUseCase<D> {
    pub fn new(unit_of_work: UnitOfWork<D>, credentials: Arc<CredentialService>) -> Self {
        Self {
            unit_of_work,
            credentials,
        }
    }

    /// Returns the stored principal without its secret.
    pub async fn execute(
        &self,
        command: CreatePrincipalCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Principal> {
        let CreatePrincipalCommand { kind, mut fields } = command;

        let secret = fields.take_secret_change();
        let mut principal = match fields.into_principal(kind, matches!(secret, SecretChange::Set(_))) {
            Ok(p) => p,
            Err(e) => return UseCaseResult::failure(e),
        };

        if let SecretChange::Set(plain) = secret {
            match self.credentials.hash(&plain).await {
                Ok(hash) => principal.password_hash = Some(hash),
                Err(e) => return UseCaseResult::failure(e),
            }
        }

        let result = self
            .unit_of_work
            .execute("create_principal", move |session| {
                Box::pin(async move {
                    let probe = UniquenessProbe::for_principal(&principal);
                    if session.exists_conflict(&probe).await? {
                        return Err(UseCaseError::identity_conflict());
                    }

                    session.insert(&principal).await?;
                    session
                        .record_audit(&AuditLog::record(
                            &ctx,
                            kind,
                            &principal.id,
                            AuditAction::Create,
                            "create_principal",
                        ))
                        .await?;
                    Ok(principal.redacted())
                })
            })
            .await;

        if let UseCaseResult::Success(p) = &result {
            info!(principal_id = %p.id, kind = %kind, "Principal created");
        }
        result
    }
}
