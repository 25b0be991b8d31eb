//! Principal Directory
//!
//! Storage seam for the four principal collections. Reads outside a
//! transaction go through [`Directory`]; every write goes through a
//! [`DirectorySession`] opened by the unit of work.

use async_trait::async_trait;

use super::entity::{LoginIdentifier, Principal, PrincipalKind};
use super::memory::{InMemoryDirectory, InMemorySession};
use super::repository::{MongoDirectorySession, PrincipalRepository};
use super::uniqueness::{UniquenessOracle, UniquenessProbe};
use crate::audit::AuditLog;
use crate::shared::error::Result;

/// One open transaction over all principal collections.
///
/// Reads through a session see the session's own uncommitted writes.
/// Records returned here still carry credential material.
#[async_trait]
pub trait DirectorySession: UniquenessOracle + Send {
    async fn find_by_id(&mut self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>>;

    /// Principal whose stored reset digest equals `digest`, in any collection.
    async fn find_by_reset_digest(&mut self, digest: &str) -> Result<Option<Principal>>;

    async fn insert(&mut self, principal: &Principal) -> Result<()>;

    async fn replace(&mut self, principal: &Principal) -> Result<()>;

    /// Returns false when nothing matched.
    async fn delete(&mut self, kind: PrincipalKind, id: &str) -> Result<bool>;

    async fn record_audit(&mut self, entry: &AuditLog) -> Result<()>;

    async fn commit(self) -> Result<()>;

    async fn abort(self) -> Result<()>;
}

#[async_trait]
pub trait Directory: Send + Sync + 'static {
    type Session: DirectorySession;

    async fn begin(&self) -> Result<Self::Session>;

    /// Single principal without credential material.
    async fn get(&self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>>;

    /// Full record including the stored hash, for secret verification.
    async fn get_with_credentials(
        &self,
        kind: PrincipalKind,
        id: &str,
    ) -> Result<Option<Principal>>;

    /// All principals of one kind, newest first, without credential material.
    async fn list(&self, kind: PrincipalKind) -> Result<Vec<Principal>>;

    /// Login lookup; keeps the stored hash so it can be verified.
    async fn find_by_identifier(
        &self,
        kind: PrincipalKind,
        identifier: &LoginIdentifier,
    ) -> Result<Option<Principal>>;

    async fn count(&self, kind: PrincipalKind) -> Result<u64>;
}

/// The configured storage engine.
pub enum DirectoryBackend {
    Mongo(PrincipalRepository),
    Memory(InMemoryDirectory),
}

pub enum BackendSession {
    Mongo(MongoDirectorySession),
    Memory(InMemorySession),
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            BackendSession::Mongo($inner) => $body,
            BackendSession::Memory($inner) => $body,
        }
    };
}

#[async_trait]
impl UniquenessOracle for BackendSession {
    async fn exists_conflict(&mut self, probe: &UniquenessProbe<'_>) -> Result<bool> {
        dispatch!(self, s => s.exists_conflict(probe).await)
    }
}

#[async_trait]
impl DirectorySession for BackendSession {
    async fn find_by_id(&mut self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>> {
        dispatch!(self, s => s.find_by_id(kind, id).await)
    }

    async fn find_by_reset_digest(&mut self, digest: &str) -> Result<Option<Principal>> {
        dispatch!(self, s => s.find_by_reset_digest(digest).await)
    }

    async fn insert(&mut self, principal: &Principal) -> Result<()> {
        dispatch!(self, s => s.insert(principal).await)
    }

    async fn replace(&mut self, principal: &Principal) -> Result<()> {
        dispatch!(self, s => s.replace(principal).await)
    }

    async fn delete(&mut self, kind: PrincipalKind, id: &str) -> Result<bool> {
        dispatch!(self, s => s.delete(kind, id).await)
    }

    async fn record_audit(&mut self, entry: &AuditLog) -> Result<()> {
        dispatch!(self, s => s.record_audit(entry).await)
    }

    async fn commit(self) -> Result<()> {
        dispatch!(self, s => s.commit().await)
    }

    async fn abort(self) -> Result<()> {
        dispatch!(self, s => s.abort().await)
    }
}

#[async_trait]
impl Directory for DirectoryBackend {
    type Session = BackendSession;

    async fn begin(&self) -> Result<BackendSession> {
        match self {
            DirectoryBackend::Mongo(repo) => Ok(BackendSession::Mongo(repo.begin().await?)),
            DirectoryBackend::Memory(dir) => Ok(BackendSession::Memory(dir.begin().await?)),
        }
    }

    async fn get(&self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>> {
        match self {
            DirectoryBackend::Mongo(repo) => repo.get(kind, id).await,
            DirectoryBackend::Memory(dir) => dir.get(kind, id).await,
        }
    }

    async fn get_with_credentials(
        &self,
        kind: PrincipalKind,
        id: &str,
    ) -> Result<Option<Principal>> {
        match self {
            DirectoryBackend::Mongo(repo) => repo.get_with_credentials(kind, id).await,
            DirectoryBackend::Memory(dir) => dir.get_with_credentials(kind, id).await,
        }
    }

    async fn list(&self, kind: PrincipalKind) -> Result<Vec<Principal>> {
        match self {
            DirectoryBackend::Mongo(repo) => repo.list(kind).await,
            DirectoryBackend::Memory(dir) => dir.list(kind).await,
        }
    }

    async fn find_by_identifier(
        &self,
        kind: PrincipalKind,
        identifier: &LoginIdentifier,
    ) -> Result<Option<Principal>> {
        match self {
            DirectoryBackend::Mongo(repo) => repo.find_by_identifier(kind, identifier).await,
            DirectoryBackend::Memory(dir) => dir.find_by_identifier(kind, identifier).await,
        }
    }

    async fn count(&self, kind: PrincipalKind) -> Result<u64> {
        match self {
            DirectoryBackend::Mongo(repo) => repo.count(kind).await,
            DirectoryBackend::Memory(dir) => dir.count(kind).await,
        }
    }
}
