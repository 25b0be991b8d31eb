//! In-memory Directory
//!
//! Snapshot-isolated store used for development and tests. A session
//! works on a copy of the committed state and buffers its writes; commit
//! rejects the whole batch if another session committed a touched record
//! first, or if an email or phone became taken meanwhile.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::directory::{Directory, DirectorySession};
use super::entity::{LoginIdentifier, Principal, PrincipalKind};
use super::uniqueness::{UniquenessOracle, UniquenessProbe};
use crate::audit::AuditLog;
use crate::shared::error::{PlatformError, Result};

type Key = (PrincipalKind, String);

#[derive(Debug, Clone)]
struct Versioned {
    version: u64,
    principal: Principal,
}

#[derive(Debug, Default)]
struct DirectoryState {
    principals: HashMap<Key, Versioned>,
    audit: Vec<AuditLog>,
    next_version: u64,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
    fail_next_write: Arc<AtomicBool>,
    stall_abort: Arc<AtomicBool>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed audit entries, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditLog> {
        self.state.read().audit.clone()
    }

    /// Make the next write inside any session fail with a storage error.
    #[cfg(test)]
    pub(crate) fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Make every later abort hang, like a driver that never answers.
    #[cfg(test)]
    pub(crate) fn stall_abort(&self) {
        self.stall_abort.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession> {
        let snapshot = self.state.read().principals.clone();
        Ok(InMemorySession {
            state: Arc::clone(&self.state),
            fail_next_write: Arc::clone(&self.fail_next_write),
            stall_abort: Arc::clone(&self.stall_abort),
            snapshot,
            writes: HashMap::new(),
            audit: Vec::new(),
        })
    }

    async fn get(&self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>> {
        let state = self.state.read();
        Ok(state
            .principals
            .get(&(kind, id.to_string()))
            .map(|v| v.principal.clone().redacted()))
    }

    async fn get_with_credentials(
        &self,
        kind: PrincipalKind,
        id: &str,
    ) -> Result<Option<Principal>> {
        let state = self.state.read();
        Ok(state
            .principals
            .get(&(kind, id.to_string()))
            .map(|v| v.principal.clone()))
    }

    async fn list(&self, kind: PrincipalKind) -> Result<Vec<Principal>> {
        let state = self.state.read();
        let mut principals: Vec<Principal> = state
            .principals
            .values()
            .filter(|v| v.principal.kind() == kind)
            .map(|v| v.principal.clone().redacted())
            .collect();
        principals.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(principals)
    }

    async fn find_by_identifier(
        &self,
        kind: PrincipalKind,
        identifier: &LoginIdentifier,
    ) -> Result<Option<Principal>> {
        let state = self.state.read();
        Ok(state
            .principals
            .values()
            .map(|v| &v.principal)
            .find(|p| p.kind() == kind && identifier.matches(p))
            .cloned())
    }

    async fn count(&self, kind: PrincipalKind) -> Result<u64> {
        let state = self.state.read();
        Ok(state.principals.keys().filter(|(k, _)| *k == kind).count() as u64)
    }
}

pub struct InMemorySession {
    state: Arc<RwLock<DirectoryState>>,
    fail_next_write: Arc<AtomicBool>,
    stall_abort: Arc<AtomicBool>,
    snapshot: HashMap<Key, Versioned>,
    /// `None` marks a delete
    writes: HashMap<Key, Option<Principal>>,
    audit: Vec<AuditLog>,
}

impl InMemorySession {
    fn lookup(&self, key: &Key) -> Option<&Principal> {
        match self.writes.get(key) {
            Some(pending) => pending.as_ref(),
            None => self.snapshot.get(key).map(|v| &v.principal),
        }
    }

    /// Everything this session can see: snapshot overlaid with its writes.
    fn visible(&self) -> impl Iterator<Item = &Principal> {
        let from_snapshot = self
            .snapshot
            .iter()
            .filter(|(key, _)| !self.writes.contains_key(*key))
            .map(|(_, v)| &v.principal);
        let from_writes = self.writes.values().filter_map(|p| p.as_ref());
        from_snapshot.chain(from_writes)
    }

    fn check_injected_failure(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::storage("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl UniquenessOracle for InMemorySession {
    async fn exists_conflict(&mut self, probe: &UniquenessProbe<'_>) -> Result<bool> {
        if probe.is_empty() {
            return Ok(false);
        }
        Ok(self.visible().any(|p| probe.matches(p)))
    }
}

#[async_trait]
impl DirectorySession for InMemorySession {
    async fn find_by_id(&mut self, kind: PrincipalKind, id: &str) -> Result<Option<Principal>> {
        Ok(self.lookup(&(kind, id.to_string())).cloned())
    }

    async fn find_by_reset_digest(&mut self, digest: &str) -> Result<Option<Principal>> {
        Ok(self
            .visible()
            .find(|p| p.reset_token_digest.as_deref() == Some(digest))
            .cloned())
    }

    async fn insert(&mut self, principal: &Principal) -> Result<()> {
        self.check_injected_failure()?;
        let key = (principal.kind(), principal.id.clone());
        if self.lookup(&key).is_some() {
            return Err(PlatformError::duplicate(
                principal.kind().label(),
                "_id",
                &principal.id,
            ));
        }
        self.writes.insert(key, Some(principal.clone()));
        Ok(())
    }

    async fn replace(&mut self, principal: &Principal) -> Result<()> {
        self.check_injected_failure()?;
        let key = (principal.kind(), principal.id.clone());
        if self.lookup(&key).is_none() {
            return Err(PlatformError::not_found(principal.kind().label(), &principal.id));
        }
        self.writes.insert(key, Some(principal.clone()));
        Ok(())
    }

    async fn delete(&mut self, kind: PrincipalKind, id: &str) -> Result<bool> {
        self.check_injected_failure()?;
        let key = (kind, id.to_string());
        if self.lookup(&key).is_none() {
            return Ok(false);
        }
        self.writes.insert(key, None);
        Ok(true)
    }

    async fn record_audit(&mut self, entry: &AuditLog) -> Result<()> {
        self.check_injected_failure()?;
        self.audit.push(entry.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let mut state = self.state.write();
        apply(&mut state, &self.snapshot, self.writes, self.audit)
    }

    async fn abort(self) -> Result<()> {
        if self.stall_abort.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        debug!(pending = self.writes.len(), "Discarding in-memory transaction");
        Ok(())
    }
}

fn apply(
    state: &mut DirectoryState,
    snapshot: &HashMap<Key, Versioned>,
    writes: HashMap<Key, Option<Principal>>,
    audit: Vec<AuditLog>,
) -> Result<()> {
    for key in writes.keys() {
        let seen = snapshot.get(key).map(|v| v.version);
        let current = state.principals.get(key).map(|v| v.version);
        if seen != current {
            return Err(PlatformError::write_conflict(format!(
                "{} {} was modified concurrently",
                key.0.label(),
                key.1
            )));
        }
    }

    // Another session may have claimed the same email or phone in a
    // different record since our snapshot was taken.
    for (key, pending) in &writes {
        let Some(principal) = pending else { continue };
        let probe = UniquenessProbe::for_principal(principal).excluding(key.0, &key.1);
        if probe.is_empty() {
            continue;
        }
        let taken = state
            .principals
            .iter()
            .filter(|(other, _)| !writes.contains_key(*other))
            .any(|(_, v)| probe.matches(&v.principal));
        if taken {
            return Err(PlatformError::duplicate(key.0.label(), "email|phone", &key.1));
        }
    }

    for (key, pending) in writes {
        match pending {
            Some(principal) => {
                state.next_version += 1;
                let version = state.next_version;
                state.principals.insert(key, Versioned { version, principal });
            }
            None => {
                state.principals.remove(&key);
            }
        }
    }
    state.audit.extend(audit);
    Ok(())
}
