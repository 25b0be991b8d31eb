//! Principal Repository
//!
//! MongoDB storage: one collection per principal kind, plus an
//! `identity_claims` collection holding one document per email and phone
//! in use. The claims' unique `_id` makes the database itself reject a
//! duplicate that slipped past the in-transaction probe.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{Acknowledgment, Collation, CollationStrength, ReadConcern, WriteConcern},
    Client, ClientSession, Collection, Database,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::directory::{Directory, DirectorySession};
use super::entity::{LoginIdentifier, Principal, PrincipalKind};
use super::uniqueness::{normalize_email, UniquenessOracle, UniquenessProbe};
use crate::audit::AuditLog;
use crate::shared::error::{PlatformError, Result};

pub const CLAIMS_COLLECTION: &str = "identity_claims";
pub const AUDIT_COLLECTION: &str = "audit_logs";

const DUPLICATE_KEY: i32 = 11000;
const WRITE_CONFLICT: i32 = 112;

/// Case-insensitive comparison for email lookups.
pub fn identity_collation() -> Collation {
    Collation::builder()
        .locale("en")
        .strength(CollationStrength::Secondary)
        .build()
}

fn without_credentials() -> Document {
    doc! { "passwordHash": 0, "resetTokenDigest": 0, "resetTokenExpiresAt": 0 }
}

fn identifier_filter(identifier: &LoginIdentifier) -> Document {
    match identifier {
        LoginIdentifier::Email(email) => doc! { "email": email },
        LoginIdentifier::Phone(phone) => doc! { "phone": phone },
    }
}

/// Reservation of one email or phone by one principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityClaim {
    #[serde(rename = "_id")]
    key: String,
    owner_id: String,
    owner_kind: PrincipalKind,
}

fn claims_for(principal: &Principal) -> Vec<IdentityClaim> {
    let email = principal
        .email
        .as_deref()
        .map(|e| format!("email:{}", normalize_email(e)));
    let phone = principal
        .phone
        .as_deref()
        .map(|p| format!("phone:{}", p.trim()));

    email
        .into_iter()
        .chain(phone)
        .map(|key| IdentityClaim {
            key,
            owner_id: principal.id.clone(),
            owner_kind: principal.kind(),
        })
        .collect()
}

fn error_code(err: &mongodb::error::Error) -> Option<i32> {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        ErrorKind::Command(e) => Some(e.code),
        _ => None,
    }
}

/// Map driver errors raised inside a transaction onto platform errors.
fn classify(err: mongodb::error::Error, kind: PrincipalKind, id: &str) -> PlatformError {
    match error_code(&err) {
        Some(DUPLICATE_KEY) => PlatformError::duplicate(kind.label(), "email|phone", id),
        Some(WRITE_CONFLICT) => PlatformError::write_conflict(format!(
            "{} {} was modified concurrently",
            kind.label(),
            id
        )),
        _ => PlatformError::Database(err),
    }
}

pub struct PrincipalRepository {
    client: Client,
    db: Database,
}

impl PrincipalRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            client: db.client().clone(),
            db: db.clone(),
        }
    }

    fn collection(&self, kind: PrincipalKind) -> Collection<Principal> {
        self.db.collection(kind.collection_name())
    }
}

#[async_trait]
impl Directory for PrincipalRepository {
    type Session = MongoDirectorySession;

    async fn begin(&self) -> Result<MongoDirectorySession> {
        let mut session = self.client.start_session().await?;
        session
            .start_transaction()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .await?;
        Ok(MongoDirectorySession {
            session,
            db: self.db.clone(),
        })
    }

    async fn get(&self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>> {
        Ok(self
            .collection(kind)
            .find_one(doc! { "_id": id })
            .projection(without_credentials())
            .await?)
    }

    async fn get_with_credentials(
        &self,
        kind: PrincipalKind,
        id: &str,
    ) -> Result<Option<Principal>> {
        Ok(self.collection(kind).find_one(doc! { "_id": id }).await?)
    }

    async fn list(&self, kind: PrincipalKind) -> Result<Vec<Principal>> {
        let cursor = self
            .collection(kind)
            .find(doc! {})
            .projection(without_credentials())
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_identifier(
        &self,
        kind: PrincipalKind,
        identifier: &LoginIdentifier,
    ) -> Result<Option<Principal>> {
        Ok(self
            .collection(kind)
            .find_one(identifier_filter(identifier))
            .collation(identity_collation())
            .await?)
    }

    async fn count(&self, kind: PrincipalKind) -> Result<u64> {
        Ok(self.collection(kind).count_documents(doc! {}).await?)
    }
}

/// A MongoDB multi-document transaction over the principal collections.
pub struct MongoDirectorySession {
    session: ClientSession,
    db: Database,
}

impl MongoDirectorySession {
    fn collection(&self, kind: PrincipalKind) -> Collection<Principal> {
        self.db.collection(kind.collection_name())
    }

    fn claims(&self) -> Collection<IdentityClaim> {
        self.db.collection(CLAIMS_COLLECTION)
    }

    async fn insert_claims(&mut self, principal: &Principal) -> Result<()> {
        let claims = self.claims();
        for claim in claims_for(principal) {
            claims
                .insert_one(&claim)
                .session(&mut self.session)
                .await
                .map_err(|e| classify(e, principal.kind(), &principal.id))?;
        }
        Ok(())
    }

    async fn release_claims(&mut self, owner_id: &str) -> Result<()> {
        self.claims()
            .delete_many(doc! { "ownerId": owner_id })
            .session(&mut self.session)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UniquenessOracle for MongoDirectorySession {
    async fn exists_conflict(&mut self, probe: &UniquenessProbe<'_>) -> Result<bool> {
        let mut clauses = Vec::new();
        if let Some(email) = probe.email {
            clauses.push(doc! { "email": email.trim() });
        }
        if let Some(phone) = probe.phone {
            clauses.push(doc! { "phone": phone.trim() });
        }
        if clauses.is_empty() {
            return Ok(false);
        }

        for kind in PrincipalKind::ALL {
            let mut filter = doc! { "$or": clauses.clone() };
            if let Some((excluded_kind, id)) = probe.exclude {
                if excluded_kind == kind {
                    filter.insert("_id", doc! { "$ne": id });
                }
            }

            let hit = self
                .db
                .collection::<Document>(kind.collection_name())
                .find_one(filter)
                .projection(doc! { "_id": 1 })
                .collation(identity_collation())
                .session(&mut self.session)
                .await?;
            if hit.is_some() {
                debug!(collection = kind.collection_name(), "Identity already in use");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl DirectorySession for MongoDirectorySession {
    async fn find_by_id(&mut self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>> {
        Ok(self
            .collection(kind)
            .find_one(doc! { "_id": id })
            .session(&mut self.session)
            .await?)
    }

    async fn find_by_reset_digest(&mut self, digest: &str) -> Result<Option<Principal>> {
        for kind in PrincipalKind::LOGIN_PRECEDENCE {
            let found = self
                .collection(kind)
                .find_one(doc! { "resetTokenDigest": digest })
                .session(&mut self.session)
                .await?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    async fn insert(&mut self, principal: &Principal) -> Result<()> {
        self.collection(principal.kind())
            .insert_one(principal)
            .session(&mut self.session)
            .await
            .map_err(|e| classify(e, principal.kind(), &principal.id))?;
        self.insert_claims(principal).await
    }

    async fn replace(&mut self, principal: &Principal) -> Result<()> {
        let result = self
            .collection(principal.kind())
            .replace_one(doc! { "_id": &principal.id }, principal)
            .session(&mut self.session)
            .await
            .map_err(|e| classify(e, principal.kind(), &principal.id))?;
        if result.matched_count == 0 {
            return Err(PlatformError::not_found(principal.kind().label(), &principal.id));
        }
        self.release_claims(&principal.id).await?;
        self.insert_claims(principal).await
    }

    async fn delete(&mut self, kind: PrincipalKind, id: &str) -> Result<bool> {
        let result = self
            .collection(kind)
            .delete_one(doc! { "_id": id })
            .session(&mut self.session)
            .await
            .map_err(|e| classify(e, kind, id))?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        self.release_claims(id).await?;
        Ok(true)
    }

    async fn record_audit(&mut self, entry: &AuditLog) -> Result<()> {
        self.db
            .collection::<AuditLog>(AUDIT_COLLECTION)
            .insert_one(entry)
            .session(&mut self.session)
            .await?;
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        self.session.commit_transaction().await.map_err(|e| match error_code(&e) {
            Some(WRITE_CONFLICT) => {
                PlatformError::write_conflict("Transaction lost a concurrent modification")
            }
            _ => PlatformError::Database(e),
        })
    }

    async fn abort(mut self) -> Result<()> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::entity::{DepartmentProfile, PrincipalProfile};

    #[test]
    fn test_claims_normalize_email() {
        let mut p = Principal::new("Ops", PrincipalProfile::Department(DepartmentProfile::default()));
        p.email = Some("Ops@Corp.COM".to_string());
        p.phone = Some(" 555-0100 ".to_string());

        let keys: Vec<String> = claims_for(&p).into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["email:ops@corp.com", "phone:555-0100"]);
    }

    #[test]
    fn test_no_claims_without_identity() {
        let p = Principal::new("Ops", PrincipalProfile::Department(DepartmentProfile::default()));
        assert!(claims_for(&p).is_empty());
    }

    #[test]
    fn test_default_projection_hides_credentials() {
        let projection = without_credentials();
        for field in ["passwordHash", "resetTokenDigest", "resetTokenExpiresAt"] {
            assert_eq!(projection.get_i32(field).unwrap(), 0);
        }
    }
}
