//! Authentication Service
//!
//! HS256 session tokens. A token names its principal and kind; it does
//! not say whether that principal still exists. Callers that need
//! freshness re-fetch (see `shared::middleware`).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::principal::entity::{Principal, PrincipalKind};
use crate::shared::error::{PlatformError, Result};
use crate::shared::tsid::TsidGenerator;

/// Default token lifetime: 90 days
pub const DEFAULT_TOKEN_EXPIRY_SECS: i64 = 90 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal ID
    pub sub: String,
    pub kind: PrincipalKind,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256
    pub secret_key: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiry_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            issuer: "hr-platform".to_string(),
            audience: "hr-platform".to_string(),
            token_expiry_secs: DEFAULT_TOKEN_EXPIRY_SECS,
        }
    }
}

/// Who a valid token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: String,
    pub kind: PrincipalKind,
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        info!(issuer = %config.issuer, "AuthService initialized with HS256");

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn token_expiry_secs(&self) -> i64 {
        self.config.token_expiry_secs
    }

    pub fn issue_token(&self, principal: &Principal) -> Result<String> {
        self.issue_token_with_lifetime(principal, Duration::seconds(self.config.token_expiry_secs))
    }

    fn issue_token_with_lifetime(&self, principal: &Principal, lifetime: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: principal.id.clone(),
            kind: principal.kind(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: TsidGenerator::generate(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to encode JWT: {}", e)))
    }

    /// Check signature, expiry, issuer and audience.
    pub fn verify_token(&self, token: &str) -> Result<TokenSubject> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.validate_nbf = true;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| TokenSubject {
                id: data.claims.sub,
                kind: data.claims.kind,
            })
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                _ => PlatformError::InvalidToken {
                    message: e.to_string(),
                },
            })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
