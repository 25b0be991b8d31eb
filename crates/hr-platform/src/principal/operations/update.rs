//! Update Principal Use Case

use std::sync::Arc;
use tracing::info;

use super::principal_not_found;
use crate::audit::{AuditAction, AuditLog};
use crate::auth::credential_service::CredentialService;
use crate::principal::directory::{Directory, DirectorySession};
use crate::principal::entity::{Principal, PrincipalKind};
use crate::principal::fields::{PrincipalFields, SecretChange};
use crate::principal::uniqueness::{UniquenessOracle, UniquenessProbe};
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone)]
pub struct UpdatePrincipalCommand {
    pub kind: PrincipalKind,
    pub id: String,
    pub fields: PrincipalFields,
}

pub struct UpdatePrincipalUseCase<D: Directory> {
    unit_of_work: UnitOfWork<D>,
    credentials: Arc<CredentialService>,
}

impl<D: Directory> UpdatePrincipalUseCase<D> {
    pub fn new(unit_of_work: UnitOfWork<D>, credentials: Arc<CredentialService>) -> Self {
        Self {
            unit_of_work,
            credentials,
        }
    }

    /// Partial update. Email and phone are re-checked only when they change,
    /// and the stored hash is replaced only when a new secret is supplied.
    pub async fn execute(
        &self,
        command: UpdatePrincipalCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Principal> {
        let UpdatePrincipalCommand { kind, id, mut fields } = command;

        if id.trim().is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "PRINCIPAL_ID_REQUIRED",
                "Principal ID is required",
            ));
        }
        if fields.is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "NO_UPDATES",
                "At least one field must be provided for update",
            ));
        }

        let new_hash = match fields.take_secret_change() {
            SecretChange::Keep => None,
            SecretChange::Set(plain) => match self.credentials.hash(&plain).await {
                Ok(hash) => Some(hash),
                Err(e) => return UseCaseResult::failure(e),
            },
        };

        let result = self
            .unit_of_work
            .execute("update_principal", move |session| {
                Box::pin(async move {
                    let mut principal = session
                        .find_by_id(kind, &id)
                        .await?
                        .ok_or_else(|| principal_not_found(kind, &id))?;

                    let (email, phone) = fields.changed_identity(&principal);
                    let probe = UniquenessProbe::new(email, phone).excluding(kind, &id);
                    if !probe.is_empty() && session.exists_conflict(&probe).await? {
                        return Err(UseCaseError::identity_conflict());
                    }

                    fields.merge_into(&mut principal)?;
                    if let Some(hash) = new_hash {
                        principal.set_secret_hash(hash);
                    }

                    session.replace(&principal).await?;
                    session
                        .record_audit(&AuditLog::record(
                            &ctx,
                            kind,
                            &id,
                            AuditAction::Update,
                            "update_principal",
                        ))
                        .await?;
                    Ok(principal.redacted())
                })
            })
            .await;

        if let UseCaseResult::Success(p) = &result {
            info!(principal_id = %p.id, kind = %kind, "Principal updated");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential_service::PlainSecret;
    use crate::principal::entity::PrincipalProfile;
    use crate::principal::fields::fixtures;
    use crate::principal::memory::InMemoryDirectory;
    use crate::principal::operations::test_support::{harness, Harness};

    fn use_case(h: &Harness) -> UpdatePrincipalUseCase<InMemoryDirectory> {
        UpdatePrincipalUseCase::new(h.unit_of_work.clone(), Arc::clone(&h.credentials))
    }

    fn command(kind: PrincipalKind, id: &str, fields: PrincipalFields) -> UpdatePrincipalCommand {
        UpdatePrincipalCommand {
            kind,
            id: id.to_string(),
            fields,
        }
    }

    #[tokio::test]
    async fn test_update_without_secret_keeps_hash() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        let before = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();

        let updated = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        salary: Some(7000.0),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap();

        assert_eq!(updated.email.as_deref(), Some("a@x.com"));
        assert_eq!(updated.phone.as_deref(), Some("111"));
        assert!(updated.password_hash.is_none());

        let after = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_eq!(after.password_hash, before.password_hash);
        match after.profile {
            PrincipalProfile::Employee(e) => assert_eq!(e.salary, 7000.0),
            other => panic!("unexpected profile {:?}", other),
        }
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_update_with_secret_rehashes() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        let before = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();

        use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        password: Some(PlainSecret::from("brand-new-secret")),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap();

        let after = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_ne!(after.password_hash, before.password_hash);
        let new_secret = PlainSecret::from("brand-new-secret");
        let old_secret = PlainSecret::from("secret-pass");
        assert!(h.credentials.verify(&new_secret, after.secret_hash()).await.unwrap());
        assert!(!h.credentials.verify(&old_secret, after.secret_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn test_own_identity_does_not_conflict() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;

        let result = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        email: Some("A@x.com".to_string()),
                        phone: Some("111".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_taking_another_identity_conflicts() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        h.seed(PrincipalKind::Ceo, fixtures::ceo("c@x.com", "222")).await;

        let err = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        phone: Some("222".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::ConflictError { .. }));

        let stored = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_eq!(stored.phone.as_deref(), Some("111"));
    }

    #[tokio::test]
    async fn test_missing_principal() {
        let h = harness();
        let err = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Ceo,
                    "0000000000000",
                    PrincipalFields {
                        company_vision: Some("Grow".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFoundError { .. }));
        assert_eq!(err.message(), "No CEO found with that ID");
    }

    #[tokio::test]
    async fn test_kind_scoped_lookup() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;

        let err = use_case(&h)
            .execute(
                command(
                    PrincipalKind::HrManager,
                    &emp.id,
                    PrincipalFields {
                        name: Some("Someone".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFoundError { .. }));
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_record_unchanged() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        let audit_before = h.directory.audit_entries().len();
        h.directory.fail_next_write();

        let err = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        email: Some("new@x.com".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::StorageError { .. }));

        let stored = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_eq!(stored.email.as_deref(), Some("a@x.com"));
        assert_eq!(h.directory.audit_entries().len(), audit_before);
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let h = harness();
        let err = use_case(&h)
            .execute(
                command(PrincipalKind::Employee, "x", PrincipalFields::default()),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NO_UPDATES");
    }

    #[tokio::test]
    async fn test_employee_name_stays_derived() {
        let h = harness();
        let emp = h
            .seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111"))
            .await;

        let err = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        name: Some("Totally Different".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FIELD_NOT_APPLICABLE");
        let stored = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_eq!(stored.name, "Ada Lovelace");

        let updated = use_case(&h)
            .execute(
                command(
                    PrincipalKind::Employee,
                    &emp.id,
                    PrincipalFields {
                        last_name: Some("Byron".to_string()),
                        ..Default::default()
                    },
                ),
                ExecutionContext::system(),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada Byron");
    }
}
