//! HR Platform Configuration
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::{parse_duration_secs, ConfigLoader};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub password: PasswordConfig,
    pub transaction: TransactionConfig,
    pub bootstrap: BootstrapConfig,

    /// Development mode: relaxed secrets, in-memory storage allowed
    pub dev_mode: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/?replicaSet=rs0&directConnection=true".to_string(),
            database: "hr_platform".to_string(),
        }
    }
}

/// Which directory backend holds principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongodb,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StorageBackend::Mongodb),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::ValidationError(format!(
                "unknown storage backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Mongodb,
        }
    }
}

/// Token signing and session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiry_secs: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "hr-platform".to_string(),
            audience: "hr-platform".to_string(),
            token_expiry_secs: 90 * 24 * 3600, // 90 days
            cookie_name: "hr_session".to_string(),
            cookie_secure: true,
        }
    }
}

/// Password policy and Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// Memory cost in KiB
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
    pub reset_token_validity_mins: i64,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
            argon2_memory_kib: 19456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
            reset_token_validity_mins: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Upper bound for a write transaction, commit included
    pub timeout_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

/// Optional first HR manager created when none exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl BootstrapConfig {
    pub fn is_configured(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() && !self.dev_mode {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set outside dev mode".to_string(),
            ));
        }
        if self.auth.token_expiry_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_expiry_secs must be positive".to_string(),
            ));
        }
        if self.transaction.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "transaction.timeout_ms must be positive".to_string(),
            ));
        }
        if self.password.min_length == 0 || self.password.min_length > self.password.max_length {
            return Err(ConfigError::ValidationError(
                "password.min_length must be between 1 and password.max_length".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Memory && !self.dev_mode {
            tracing::warn!("In-memory storage selected outside dev mode; data is lost on restart");
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# HR Platform Configuration
# Environment variables (HR_*) override these settings

dev_mode = false

[http]
port = 3000
host = "0.0.0.0"
cors_origins = ["*"]

[mongodb]
uri = "mongodb://localhost:27017/?replicaSet=rs0&directConnection=true"
database = "hr_platform"

[storage]
backend = "mongodb"  # mongodb or memory

[auth]
jwt_secret = ""
issuer = "hr-platform"
audience = "hr-platform"
token_expiry_secs = 7776000
cookie_name = "hr_session"
cookie_secure = true

[password]
min_length = 6
max_length = 128
argon2_memory_kib = 19456
argon2_iterations = 2
argon2_parallelism = 1
reset_token_validity_mins = 10

[transaction]
timeout_ms = 5000

[bootstrap]
name = ""
username = ""
email = ""
phone = ""
password = ""
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Mongodb);
        assert_eq!(config.password.min_length, 6);
        assert_eq!(config.auth.token_expiry_secs, 7_776_000);
        assert!(!config.bootstrap.is_configured());
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.mongodb.database, "hr_platform");
        assert_eq!(config.transaction.timeout_ms, 5000);
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "dev_mode = true\n[storage]\nbackend = \"memory\"\n[http]\nport = 9000"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.http.port, 9000);
        // Untouched sections keep their defaults
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.auth.issuer, "hr-platform");
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nport = ").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validate_requires_secret_outside_dev_mode() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.dev_mode = true;
        assert!(config.validate().is_ok());

        config.dev_mode = false;
        config.auth.jwt_secret = "s3cret".to_string();
        assert!(config.validate().is_ok());

        config.transaction.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("Mongo".parse::<StorageBackend>().unwrap(), StorageBackend::Mongodb);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}
