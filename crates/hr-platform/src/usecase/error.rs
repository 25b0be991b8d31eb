//! Use Case Errors
//!
//! Every failure a use case can report, classified so the HTTP layer can
//! map it without inspecting messages.
//!
//! ```ignore
//! use hr_platform::{details, usecase::UseCaseError};
//!
//! UseCaseError::validation_with_details(
//!     "MISSING_FIELDS",
//!     "Missing required fields: email, phone",
//!     details! { "fields" => ["email", "phone"] },
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tracing::{error, warn};

use crate::shared::error::PlatformError;

/// Message reported for any email/phone uniqueness violation.
pub const IDENTITY_CONFLICT_MESSAGE: &str = "email or phone already in use";

/// Client-facing message for storage failures; the cause is only logged.
pub const STORAGE_FAILURE_MESSAGE: &str = "Something went wrong";

/// Macro for creating error detail maps.
#[macro_export]
macro_rules! details {
    () => {
        std::collections::HashMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::new();
        $(
            map.insert($key.to_string(), serde_json::json!($value));
        )+
        map
    }};
}

type Details = HashMap<String, serde_json::Value>;

/// Categorized use case failure.
///
/// - `ValidationError` -> 400
/// - `ConflictError` -> 400
/// - `NotFoundError` -> 404
/// - `InvalidCredentials`, `Unauthorized`, `IncorrectSecret` -> 401
/// - `Forbidden` -> 403
/// - `StorageError` -> 500
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UseCaseError {
    /// Missing or malformed input.
    ValidationError {
        code: String,
        message: String,
        #[serde(default)]
        details: Details,
    },

    /// Uniqueness violation or a concurrent write on the same record.
    ConflictError {
        code: String,
        message: String,
        #[serde(default)]
        details: Details,
    },

    NotFoundError {
        code: String,
        message: String,
        #[serde(default)]
        details: Details,
    },

    /// Login failed. Deliberately silent about which step failed.
    InvalidCredentials { code: String, message: String },

    /// Missing, malformed, expired or forged token.
    Unauthorized { code: String, message: String },

    /// Authenticated, but not allowed.
    Forbidden { code: String, message: String },

    /// Old secret did not match during rotation.
    IncorrectSecret { code: String, message: String },

    /// Transaction or infrastructure failure. Never retried.
    StorageError { code: String, message: String },
}

impl UseCaseError {
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn validation_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Details,
    ) -> Self {
        Self::ValidationError {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConflictError {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// The email/phone uniqueness violation.
    pub fn identity_conflict() -> Self {
        Self::conflict("IDENTITY_CONFLICT", IDENTITY_CONFLICT_MESSAGE)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFoundError {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn not_found_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Details,
    ) -> Self {
        Self::NotFoundError {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::InvalidCredentials {
            code: "INVALID_CREDENTIALS".to_string(),
            message: "Incorrect email/phone or password".to_string(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn incorrect_secret() -> Self {
        Self::IncorrectSecret {
            code: "INCORRECT_OLD_PASSWORD".to_string(),
            message: "Incorrect old password".to_string(),
        }
    }

    pub fn storage(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageError {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ValidationError { code, .. }
            | Self::ConflictError { code, .. }
            | Self::NotFoundError { code, .. }
            | Self::InvalidCredentials { code, .. }
            | Self::Unauthorized { code, .. }
            | Self::Forbidden { code, .. }
            | Self::IncorrectSecret { code, .. }
            | Self::StorageError { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValidationError { message, .. }
            | Self::ConflictError { message, .. }
            | Self::NotFoundError { message, .. }
            | Self::InvalidCredentials { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::IncorrectSecret { message, .. }
            | Self::StorageError { message, .. } => message,
        }
    }

    /// Suggested HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ValidationError { .. } | Self::ConflictError { .. } => 400,
            Self::NotFoundError { .. } => 404,
            Self::InvalidCredentials { .. }
            | Self::Unauthorized { .. }
            | Self::IncorrectSecret { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::StorageError { .. } => 500,
        }
    }
}

impl std::fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for UseCaseError {}

impl From<PlatformError> for UseCaseError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::UseCase(inner) => inner,
            PlatformError::Duplicate { .. } => UseCaseError::identity_conflict(),
            PlatformError::WriteConflict { message } => {
                warn!(%message, "Transaction lost a concurrent modification");
                UseCaseError::storage("WRITE_CONFLICT", STORAGE_FAILURE_MESSAGE)
            }
            PlatformError::NotFound { entity_type, id } => UseCaseError::not_found_with_details(
                "NOT_FOUND",
                format!("No {} found with that ID", entity_type),
                crate::details! { "id" => id },
            ),
            PlatformError::Validation { message } => UseCaseError::validation("INVALID", message),
            PlatformError::Unauthorized { message } => {
                UseCaseError::unauthorized("UNAUTHORIZED", message)
            }
            PlatformError::Forbidden { message } => UseCaseError::forbidden("FORBIDDEN", message),
            PlatformError::InvalidCredentials => UseCaseError::invalid_credentials(),
            PlatformError::TokenExpired => {
                UseCaseError::unauthorized("TOKEN_EXPIRED", "Token expired")
            }
            PlatformError::InvalidToken { message } => {
                UseCaseError::unauthorized("INVALID_TOKEN", message)
            }
            other => {
                error!(error = %other, "Storage operation failed");
                UseCaseError::storage("STORAGE_FAILURE", STORAGE_FAILURE_MESSAGE)
            }
        }
    }
}
