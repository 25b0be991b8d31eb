//! Bootstrap Account
//!
//! Every principal write needs an authenticated HR manager or CEO, so a
//! fresh deployment gets its first HR manager from configuration.

use tracing::info;

use super::directory::Directory;
use super::entity::{Principal, PrincipalKind};
use super::fields::PrincipalFields;
use super::operations::{CreatePrincipalCommand, CreatePrincipalUseCase};
use crate::auth::credential_service::PlainSecret;
use crate::usecase::{ExecutionContext, UseCaseError};

#[derive(Debug, Clone)]
pub struct BootstrapAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: PlainSecret,
}

/// Create the configured HR manager unless one already exists.
///
/// Returns the new principal, or `None` when the directory already has
/// an HR manager.
pub async fn ensure_bootstrap_manager<D: Directory>(
    directory: &D,
    create: &CreatePrincipalUseCase<D>,
    account: BootstrapAccount,
) -> Result<Option<Principal>, UseCaseError> {
    if directory.count(PrincipalKind::HrManager).await? > 0 {
        return Ok(None);
    }

    let fields = PrincipalFields {
        name: Some(account.name),
        username: Some(account.username),
        email: Some(account.email),
        phone: Some(account.phone),
        password: Some(account.password),
        ..Default::default()
    };
    let command = CreatePrincipalCommand {
        kind: PrincipalKind::HrManager,
        fields,
    };

    let created = create
        .execute(command, ExecutionContext::system())
        .await
        .into_result()?;
    info!(principal_id = %created.id, "Bootstrap HR manager created");
    Ok(Some(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::operations::test_support::harness;

    fn account() -> BootstrapAccount {
        BootstrapAccount {
            name: "First Manager".to_string(),
            username: "first".to_string(),
            email: "hr@corp.com".to_string(),
            phone: "+1 555 0100".to_string(),
            password: PlainSecret::from("bootstrap-secret"),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let h = harness();
        let create = CreatePrincipalUseCase::new(h.unit_of_work.clone(), h.credentials.clone());

        let first = ensure_bootstrap_manager(h.directory.as_ref(), &create, account())
            .await
            .unwrap();
        assert!(first.is_some());

        let second = ensure_bootstrap_manager(h.directory.as_ref(), &create, account())
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(h.directory.count(PrincipalKind::HrManager).await.unwrap(), 1);

        let audit = h.directory.audit_entries();
        assert_eq!(audit[0].principal_id, "system");
    }
}
