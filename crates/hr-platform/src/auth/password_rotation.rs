//! Secret Rotation and Reset
//!
//! Rotation needs the current secret; reset needs a token issued by
//! [`RequestSecretResetUseCase`]. Both hash the new secret before the
//! transaction opens.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::credential_service::{digest_reset_token, CredentialService, PlainSecret, ResetToken};
use crate::audit::{AuditAction, AuditLog};
use crate::principal::directory::{Directory, DirectorySession};
use crate::principal::entity::{LoginIdentifier, Principal, PrincipalKind};
use crate::principal::operations::principal_not_found;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone)]
pub struct RotateSecretCommand {
    pub kind: PrincipalKind,
    pub id: String,
    pub current_secret: PlainSecret,
    pub new_secret: PlainSecret,
}

pub struct RotateSecretUseCase<D: Directory> {
    unit_of_work: UnitOfWork<D>,
    credentials: Arc<CredentialService>,
}

impl<D: Directory> RotateSecretUseCase<D> {
    pub fn new(unit_of_work: UnitOfWork<D>, credentials: Arc<CredentialService>) -> Self {
        Self {
            unit_of_work,
            credentials,
        }
    }

    pub async fn execute(
        &self,
        command: RotateSecretCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Principal> {
        let RotateSecretCommand {
            kind,
            id,
            current_secret,
            new_secret,
        } = command;

        let stored = match self.unit_of_work.directory().get_with_credentials(kind, &id).await {
            Ok(Some(p)) => p,
            Ok(None) => return UseCaseResult::failure(principal_not_found(kind, &id)),
            Err(e) => return UseCaseResult::failure(UseCaseError::from(e)),
        };

        match self.credentials.verify(&current_secret, stored.secret_hash()).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(principal_id = %id, "Secret rotation rejected: current secret mismatch");
                return UseCaseResult::failure(UseCaseError::incorrect_secret());
            }
            Err(e) => return UseCaseResult::failure(UseCaseError::from(e)),
        }

        let new_hash = match self.credentials.hash(&new_secret).await {
            Ok(h) => h,
            Err(e) => return UseCaseResult::failure(e),
        };
        let verified_hash = stored.password_hash;

        let result = self
            .unit_of_work
            .execute("rotate_secret", move |session| {
                Box::pin(async move {
                    let mut principal = session
                        .find_by_id(kind, &id)
                        .await?
                        .ok_or_else(|| principal_not_found(kind, &id))?;

                    // Changed since we verified: the checked secret is stale.
                    if principal.password_hash != verified_hash {
                        return Err(UseCaseError::incorrect_secret());
                    }

                    principal.set_secret_hash(new_hash);
                    session.replace(&principal).await?;
                    session
                        .record_audit(&AuditLog::record(
                            &ctx,
                            kind,
                            &id,
                            AuditAction::SecretRotated,
                            "rotate_secret",
                        ))
                        .await?;
                    Ok(principal.redacted())
                })
            })
            .await;

        if let UseCaseResult::Success(p) = &result {
            info!(principal_id = %p.id, kind = %kind, "Secret rotated");
        }
        result
    }
}

/// Reset token issued for a principal, plus who it belongs to.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub principal_id: String,
    pub kind: PrincipalKind,
    pub token: ResetToken,
}

pub struct RequestSecretResetUseCase<D: Directory> {
    unit_of_work: UnitOfWork<D>,
    credentials: Arc<CredentialService>,
}

impl<D: Directory> RequestSecretResetUseCase<D> {
    pub fn new(unit_of_work: UnitOfWork<D>, credentials: Arc<CredentialService>) -> Self {
        Self {
            unit_of_work,
            credentials,
        }
    }

    /// Store a fresh token digest on the principal holding `identifier`.
    /// The plaintext token is returned for out-of-band delivery.
    pub async fn execute(&self, identifier: &str, ctx: ExecutionContext) -> UseCaseResult<IssuedReset> {
        let Some(parsed) = LoginIdentifier::parse(identifier) else {
            return UseCaseResult::failure(UseCaseError::validation(
                "IDENTIFIER_REQUIRED",
                "Please provide an email or phone",
            ));
        };

        let mut owner = None;
        for kind in PrincipalKind::LOGIN_PRECEDENCE {
            match self.unit_of_work.directory().find_by_identifier(kind, &parsed).await {
                Ok(Some(p)) => {
                    owner = Some(p);
                    break;
                }
                Ok(None) => {}
                Err(e) => return UseCaseResult::failure(UseCaseError::from(e)),
            }
        }
        let Some(owner) = owner else {
            return UseCaseResult::failure(UseCaseError::not_found(
                "PRINCIPAL_NOT_FOUND",
                "There is no user with that email or phone",
            ));
        };

        let token = self.credentials.issue_reset_token();
        let kind = owner.kind();
        let id = owner.id;
        let digest = token.digest.clone();
        let expires_at = token.expires_at;

        self.unit_of_work
            .execute("request_secret_reset", move |session| {
                Box::pin(async move {
                    let mut principal = session
                        .find_by_id(kind, &id)
                        .await?
                        .ok_or_else(|| principal_not_found(kind, &id))?;
                    principal.set_reset_token(digest, expires_at);
                    session.replace(&principal).await?;
                    session
                        .record_audit(&AuditLog::record(
                            &ctx,
                            kind,
                            &id,
                            AuditAction::ResetRequested,
                            "request_secret_reset",
                        ))
                        .await?;
                    Ok(IssuedReset {
                        principal_id: id,
                        kind,
                        token,
                    })
                })
            })
            .await
    }
}

pub struct CompleteSecretResetUseCase<D: Directory> {
    unit_of_work: UnitOfWork<D>,
    credentials: Arc<CredentialService>,
}

impl<D: Directory> CompleteSecretResetUseCase<D> {
    pub fn new(unit_of_work: UnitOfWork<D>, credentials: Arc<CredentialService>) -> Self {
        Self {
            unit_of_work,
            credentials,
        }
    }

    /// Replace the secret of whoever holds `token`. The token is single use.
    pub async fn execute(
        &self,
        token: &str,
        new_secret: PlainSecret,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Principal> {
        let new_hash = match self.credentials.hash(&new_secret).await {
            Ok(h) => h,
            Err(e) => return UseCaseResult::failure(e),
        };
        let digest = digest_reset_token(token);

        self.unit_of_work
            .execute("complete_secret_reset", move |session| {
                Box::pin(async move {
                    let mut principal = match session.find_by_reset_digest(&digest).await? {
                        Some(p) if !p.reset_token_expired(Utc::now()) => p,
                        _ => return Err(invalid_reset_token()),
                    };

                    principal.set_secret_hash(new_hash);
                    session.replace(&principal).await?;
                    session
                        .record_audit(&AuditLog::record(
                            &ctx,
                            principal.kind(),
                            &principal.id,
                            AuditAction::SecretReset,
                            "complete_secret_reset",
                        ))
                        .await?;
                    Ok(principal.redacted())
                })
            })
            .await
    }
}

fn invalid_reset_token() -> UseCaseError {
    UseCaseError::validation("RESET_TOKEN_INVALID", "Token is invalid or has expired")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::fields::fixtures;
    use crate::principal::memory::InMemoryDirectory;
    use crate::principal::operations::test_support::{harness, Harness};

    fn rotate(h: &Harness) -> RotateSecretUseCase<InMemoryDirectory> {
        RotateSecretUseCase::new(h.unit_of_work.clone(), h.credentials.clone())
    }

    fn rotation(kind: PrincipalKind, id: &str, current: &str, new: &str) -> RotateSecretCommand {
        RotateSecretCommand {
            kind,
            id: id.to_string(),
            current_secret: PlainSecret::from(current),
            new_secret: PlainSecret::from(new),
        }
    }

    #[tokio::test]
    async fn test_rotation_with_wrong_secret_keeps_hash() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        let before = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();

        let err = rotate(&h)
            .execute(
                rotation(PrincipalKind::Employee, &emp.id, "wrong-secret", "another-secret"),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::IncorrectSecret { .. }));
        assert_eq!(err.http_status_code(), 401);

        let after = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_eq!(after.password_hash, before.password_hash);
    }

    #[tokio::test]
    async fn test_rotation_replaces_hash() {
        let h = harness();
        let ceo = h.seed(PrincipalKind::Ceo, fixtures::ceo("c@x.com", "222")).await;

        rotate(&h)
            .execute(
                rotation(PrincipalKind::Ceo, &ceo.id, "secret-pass", "rotated-secret"),
                ExecutionContext::create(ceo.id.clone()),
            )
            .await
            .unwrap();

        let stored = h.stored(PrincipalKind::Ceo, &ceo.id).await.unwrap();
        assert!(h
            .credentials
            .verify(&PlainSecret::from("rotated-secret"), stored.secret_hash())
            .await
            .unwrap());
        assert!(!h
            .credentials
            .verify(&PlainSecret::from("secret-pass"), stored.secret_hash())
            .await
            .unwrap());

        let last = h.directory.audit_entries().pop().unwrap();
        assert_eq!(last.action, AuditAction::SecretRotated);
        assert_eq!(last.principal_id, ceo.id);
    }

    #[tokio::test]
    async fn test_rotation_enforces_policy() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        let err = rotate(&h)
            .execute(
                rotation(PrincipalKind::Employee, &emp.id, "secret-pass", "abc"),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PASSWORD_TOO_SHORT");
    }

    #[tokio::test]
    async fn test_reset_flow() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;

        let issued = RequestSecretResetUseCase::new(h.unit_of_work.clone(), h.credentials.clone())
            .execute("a@x.com", ExecutionContext::system())
            .await
            .unwrap();
        assert_eq!(issued.principal_id, emp.id);

        let stored = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert_eq!(stored.reset_token_digest.as_deref(), Some(issued.token.digest.as_str()));

        let complete = CompleteSecretResetUseCase::new(h.unit_of_work.clone(), h.credentials.clone());
        let reset = complete
            .execute(
                &issued.token.token,
                PlainSecret::from("after-reset"),
                ExecutionContext::system(),
            )
            .await
            .unwrap();
        assert_eq!(reset.id, emp.id);

        let stored = h.stored(PrincipalKind::Employee, &emp.id).await.unwrap();
        assert!(stored.reset_token_digest.is_none());
        assert!(h
            .credentials
            .verify(&PlainSecret::from("after-reset"), stored.secret_hash())
            .await
            .unwrap());

        // Single use
        let err = complete
            .execute(
                &issued.token.token,
                PlainSecret::from("second-try"),
                ExecutionContext::system(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RESET_TOKEN_INVALID");
    }

    #[tokio::test]
    async fn test_reset_with_unknown_token() {
        let h = harness();
        let err = CompleteSecretResetUseCase::new(h.unit_of_work.clone(), h.credentials.clone())
            .execute("deadbeef", PlainSecret::from("whatever"), ExecutionContext::system())
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_reset_request_for_unknown_identifier() {
        let h = harness();
        let err = RequestSecretResetUseCase::new(h.unit_of_work.clone(), h.credentials.clone())
            .execute("ghost@x.com", ExecutionContext::system())
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFoundError { .. }));
    }
}
