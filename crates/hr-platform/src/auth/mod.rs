//! Authentication
//!
//! - [`credential_service`]: Argon2id hashing, reset tokens
//! - [`auth_service`]: HS256 session tokens
//! - [`login`]: identifier + secret to token
//! - [`password_rotation`]: rotation and token-based reset
//! - [`auth_api`]: HTTP endpoints

pub mod auth_api;
pub mod auth_service;
pub mod credential_service;
pub mod login;
pub mod password_rotation;

pub use auth_api::{auth_router, AuthApiState};
pub use auth_service::{AuthConfig, AuthService, TokenClaims, TokenSubject};
pub use credential_service::{Argon2Config, CredentialService, PasswordPolicy, PlainSecret, ResetToken};
pub use login::{LoginOutcome, LoginService};
pub use password_rotation::{
    CompleteSecretResetUseCase, IssuedReset, RequestSecretResetUseCase, RotateSecretCommand,
    RotateSecretUseCase,
};
