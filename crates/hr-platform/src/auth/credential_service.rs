//! Credential Service
//!
//! Argon2id hashing of principal secrets and single-use reset tokens.
//! Hashing is CPU-bound, so it runs on the blocking pool and never inside
//! an open transaction.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

use crate::shared::error::{PlatformError, Result};
use crate::usecase::UseCaseError;

/// A plaintext secret as received from a client.
///
/// Never printed; `Debug` shows a placeholder.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlainSecret(String);

impl PlainSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlainSecret {
    fn from(secret: &str) -> Self {
        Self(secret.to_string())
    }
}

impl fmt::Debug for PlainSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlainSecret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    pub fn validate(&self, secret: &PlainSecret) -> std::result::Result<(), UseCaseError> {
        let length = secret.expose().chars().count();
        if length < self.min_length {
            return Err(UseCaseError::validation(
                "PASSWORD_TOO_SHORT",
                format!("Password must be at least {} characters", self.min_length),
            ));
        }
        if length > self.max_length {
            return Err(UseCaseError::validation(
                "PASSWORD_TOO_LONG",
                format!("Password must be at most {} characters", self.max_length),
            ));
        }
        Ok(())
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Config {
    /// Cheap parameters for tests.
    pub fn testing() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn to_params(&self) -> Result<Params> {
        Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| PlatformError::internal(format!("Invalid Argon2 parameters: {}", e)))
    }
}

/// A freshly issued reset token. Only `digest` is ever stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

/// SHA-256 hex digest under which a reset token is stored and looked up.
pub fn digest_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

pub struct CredentialService {
    argon2: Argon2<'static>,
    /// Hash of a throwaway secret under the live parameters. Checked when
    /// there is no real hash, so a miss costs as much as a wrong secret.
    decoy_hash: String,
    policy: PasswordPolicy,
    reset_validity: Duration,
}

impl CredentialService {
    pub fn new(
        config: Argon2Config,
        policy: PasswordPolicy,
        reset_validity: Duration,
    ) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.to_params()?);
        let decoy_hash = argon2
            .hash_password(b"decoy-secret", &SaltString::generate(&mut OsRng))
            .map_err(|e| PlatformError::internal(format!("Failed to build decoy hash: {}", e)))?
            .to_string();
        Ok(Self {
            argon2,
            decoy_hash,
            policy,
            reset_validity,
        })
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Check the policy, then hash. The result is a PHC string with its own
    /// random salt, so equal secrets never share a hash.
    pub async fn hash(&self, secret: &PlainSecret) -> std::result::Result<String, UseCaseError> {
        self.policy.validate(secret)?;

        let argon2 = self.argon2.clone();
        let secret = secret.clone();
        let hashed = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(secret.expose().as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|e| UseCaseError::storage("HASH_FAILED", format!("Hashing task failed: {}", e)))?
        .map_err(|e| UseCaseError::storage("HASH_FAILED", format!("Failed to hash password: {}", e)))?;

        debug!("Password hashed");
        Ok(hashed)
    }

    /// Compare a candidate against a stored hash.
    ///
    /// A missing or unparseable hash verifies as false rather than erroring,
    /// after the same Argon2 work a real comparison costs, so callers cannot
    /// tell it apart from a wrong secret.
    pub async fn verify(&self, candidate: &PlainSecret, stored: Option<&str>) -> Result<bool> {
        let argon2 = self.argon2.clone();
        let candidate = candidate.clone();
        let stored = stored.map(str::to_string);
        let decoy = self.decoy_hash.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parsed) = stored.as_deref().and_then(|s| PasswordHash::new(s).ok()) {
                return argon2
                    .verify_password(candidate.expose().as_bytes(), &parsed)
                    .is_ok();
            }
            if let Ok(parsed) = PasswordHash::new(&decoy) {
                let _ = argon2.verify_password(candidate.expose().as_bytes(), &parsed);
            }
            false
        })
        .await
        .map_err(|e| PlatformError::internal(format!("Verification task failed: {}", e)))
    }

    /// 32 random bytes, hex encoded, valid for the configured window.
    pub fn issue_reset_token(&self) -> ResetToken {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        ResetToken {
            digest: digest_reset_token(&token),
            token,
            expires_at: Utc::now() + self.reset_validity,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_credentials() -> CredentialService {
    match CredentialService::new(
        Argon2Config::testing(),
        PasswordPolicy::default(),
        Duration::minutes(10),
    ) {
        Ok(service) => service,
        Err(e) => panic!("test credentials: {}", e),
    }
}
