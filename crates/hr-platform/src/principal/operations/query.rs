//! Principal Queries

use std::sync::Arc;

use super::principal_not_found;
use crate::principal::directory::Directory;
use crate::principal::entity::{Principal, PrincipalKind};
use crate::usecase::{UseCaseError, UseCaseResult};

/// Read side. Results never carry credential material.
pub struct PrincipalQueries<D: Directory> {
    directory: Arc<D>,
}

impl<D: Directory> PrincipalQueries<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub async fn get(&self, kind: PrincipalKind, id: &str) -> UseCaseResult<Principal> {
        match self.directory.get(kind, id).await {
            Ok(Some(p)) => UseCaseResult::success(p.redacted()),
            Ok(None) => UseCaseResult::failure(principal_not_found(kind, id)),
            Err(e) => UseCaseResult::failure(UseCaseError::from(e)),
        }
    }

    /// Newest first.
    pub async fn list(&self, kind: PrincipalKind) -> UseCaseResult<Vec<Principal>> {
        match self.directory.list(kind).await {
            Ok(principals) => {
                UseCaseResult::success(principals.into_iter().map(Principal::redacted).collect())
            }
            Err(e) => UseCaseResult::failure(UseCaseError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::fields::fixtures;
    use crate::principal::operations::test_support::harness;

    #[tokio::test]
    async fn test_list_newest_first() {
        let h = harness();
        let first = h.seed(PrincipalKind::Department, fixtures::department("Finance", None)).await;
        let second = h.seed(PrincipalKind::Department, fixtures::department("Legal", None)).await;

        let queries = PrincipalQueries::new(h.directory.clone());
        let listed = queries.list(PrincipalKind::Department).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        assert!(queries.list(PrincipalKind::Ceo).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let h = harness();
        let queries = PrincipalQueries::new(h.directory.clone());
        let err = queries.get(PrincipalKind::Employee, "nope").await.unwrap_err();
        assert_eq!(err.http_status_code(), 404);
    }
}
