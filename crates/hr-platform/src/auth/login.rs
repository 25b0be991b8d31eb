//! Login
//!
//! Searches the principal collections in fixed precedence and verifies the
//! secret. Every failure looks the same to the caller.

use std::sync::Arc;
use tracing::{info, warn};

use super::auth_service::AuthService;
use super::credential_service::{CredentialService, PlainSecret};
use crate::principal::directory::Directory;
use crate::principal::entity::{LoginIdentifier, Principal, PrincipalKind};
use crate::usecase::{UseCaseError, UseCaseResult};

/// A signed token plus the principal it was issued for.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub principal: Principal,
}

pub struct LoginService<D: Directory> {
    directory: Arc<D>,
    credentials: Arc<CredentialService>,
    auth: Arc<AuthService>,
}

impl<D: Directory> LoginService<D> {
    pub fn new(
        directory: Arc<D>,
        credentials: Arc<CredentialService>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            directory,
            credentials,
            auth,
        }
    }

    /// `identifier` is an email (anything containing `@`) or a phone.
    pub async fn login(&self, identifier: &str, secret: &PlainSecret) -> UseCaseResult<LoginOutcome> {
        let Some(identifier) = LoginIdentifier::parse(identifier) else {
            return UseCaseResult::failure(UseCaseError::validation(
                "IDENTIFIER_REQUIRED",
                "Please provide email or phone and password",
            ));
        };
        if secret.expose().is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "IDENTIFIER_REQUIRED",
                "Please provide email or phone and password",
            ));
        }

        let principal = match self.resolve(&identifier).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                // Burn a verification so a miss takes as long as a wrong secret.
                let _ = self.credentials.verify(secret, None).await;
                warn!("Login rejected: unknown identifier");
                return UseCaseResult::failure(UseCaseError::invalid_credentials());
            }
            Err(e) => return UseCaseResult::failure(e),
        };

        let verified = match self.credentials.verify(secret, principal.secret_hash()).await {
            Ok(v) => v,
            Err(e) => return UseCaseResult::failure(UseCaseError::from(e)),
        };
        if !verified || !principal.is_active() {
            warn!(principal_id = %principal.id, kind = %principal.kind(), "Login rejected");
            return UseCaseResult::failure(UseCaseError::invalid_credentials());
        }

        let token = match self.auth.issue_token(&principal) {
            Ok(t) => t,
            Err(e) => return UseCaseResult::failure(UseCaseError::from(e)),
        };

        info!(principal_id = %principal.id, kind = %principal.kind(), "Login succeeded");
        UseCaseResult::success(LoginOutcome {
            token,
            principal: principal.redacted(),
        })
    }

    /// First principal holding `identifier`, in login precedence order.
    async fn resolve(&self, identifier: &LoginIdentifier) -> Result<Option<Principal>, UseCaseError> {
        for kind in PrincipalKind::LOGIN_PRECEDENCE {
            if let Some(found) = self.directory.find_by_identifier(kind, identifier).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth_service::AuthConfig;
    use crate::principal::entity::PrincipalStatus;
    use crate::principal::fields::{fixtures, PrincipalFields};
    use crate::principal::memory::InMemoryDirectory;
    use crate::principal::operations::test_support::{harness, Harness};
    use crate::principal::operations::{UpdatePrincipalCommand, UpdatePrincipalUseCase};
    use crate::usecase::ExecutionContext;

    fn auth() -> Arc<AuthService> {
        Arc::new(AuthService::new(AuthConfig {
            secret_key: "login-test".to_string(),
            ..Default::default()
        }))
    }

    fn service(h: &Harness, auth: Arc<AuthService>) -> LoginService<InMemoryDirectory> {
        LoginService::new(h.directory.clone(), h.credentials.clone(), auth)
    }

    fn secret() -> PlainSecret {
        PlainSecret::from("secret-pass")
    }

    #[tokio::test]
    async fn test_login_by_email_and_phone() {
        let h = harness();
        let auth = auth();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        let login = service(&h, auth.clone());

        let by_email = login.login("A@X.com", &secret()).await.unwrap();
        assert_eq!(by_email.principal.id, emp.id);
        assert!(by_email.principal.password_hash.is_none());
        assert_eq!(auth.verify_token(&by_email.token).unwrap().id, emp.id);

        let by_phone = login.login("111", &secret()).await.unwrap();
        assert_eq!(by_phone.principal.id, emp.id);
    }

    #[tokio::test]
    async fn test_wrong_secret_and_unknown_identifier_look_alike() {
        let h = harness();
        h.seed(PrincipalKind::Ceo, fixtures::ceo("c@x.com", "222")).await;
        let login = service(&h, auth());

        let wrong = login
            .login("c@x.com", &PlainSecret::from("not-it"))
            .await
            .unwrap_err();
        let unknown = login.login("nobody@x.com", &secret()).await.unwrap_err();

        assert!(matches!(wrong, UseCaseError::InvalidCredentials { .. }));
        assert_eq!(wrong.message(), unknown.message());
        assert_eq!(wrong.code(), unknown.code());
    }

    #[tokio::test]
    async fn test_each_kind_can_log_in() {
        let h = harness();
        let login = service(&h, auth());
        let hr = h.seed(PrincipalKind::HrManager, fixtures::hr_manager("h@x.com", "333")).await;
        let dept = h
            .seed(PrincipalKind::Department, fixtures::department("Ops", Some("444")))
            .await;

        assert_eq!(login.login("h@x.com", &secret()).await.unwrap().principal.id, hr.id);
        let outcome = login.login("444", &secret()).await.unwrap();
        assert_eq!(outcome.principal.id, dept.id);
        assert_eq!(outcome.principal.kind(), PrincipalKind::Department);
    }

    #[tokio::test]
    async fn test_inactive_principal_rejected() {
        let h = harness();
        let emp = h.seed(PrincipalKind::Employee, fixtures::employee("a@x.com", "111")).await;
        UpdatePrincipalUseCase::new(h.unit_of_work.clone(), h.credentials.clone())
            .execute(
                UpdatePrincipalCommand {
                    kind: PrincipalKind::Employee,
                    id: emp.id,
                    fields: PrincipalFields {
                        status: Some(PrincipalStatus::Inactive),
                        ..Default::default()
                    },
                },
                ExecutionContext::system(),
            )
            .await
            .unwrap();

        let err = service(&h, auth()).login("a@x.com", &secret()).await.unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidCredentials { .. }));
    }

    #[tokio::test]
    async fn test_blank_input_is_validation_error() {
        let h = harness();
        let err = service(&h, auth()).login("  ", &secret()).await.unwrap_err();
        assert!(matches!(err, UseCaseError::ValidationError { .. }));
    }
}
