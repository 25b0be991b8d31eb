//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "hr-platform.toml",
    "./config/config.toml",
    "/etc/hr-platform/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok())?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file not found, searching standard paths");
        }

        if let Ok(path) = env::var("HR_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply overrides from a variable lookup.
///
/// `HR_*` variables win over the legacy deployment names (`MONGODB_URI`,
/// `JWT_SECRET`, `JWT_EXPIRES_IN`, `PORT`), which win over the file.
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k));

    // HTTP
    if let Some(val) = first(&["HR_HTTP_PORT", "PORT"]) {
        config.http.port = val
            .parse()
            .map_err(|_| ConfigError::EnvError(format!("invalid port: {}", val)))?;
    }
    if let Some(val) = lookup("HR_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("HR_CORS_ORIGINS") {
        config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
    }

    // MongoDB
    if let Some(val) = first(&["HR_MONGODB_URI", "MONGODB_URI"]) {
        config.mongodb.uri = val;
    }
    if let Some(val) = lookup("HR_MONGODB_DATABASE") {
        config.mongodb.database = val;
    }

    // Storage
    if let Some(val) = lookup("HR_STORAGE_BACKEND") {
        config.storage.backend = val.parse()?;
    }

    // Auth
    if let Some(val) = first(&["HR_JWT_SECRET", "JWT_SECRET"]) {
        config.auth.jwt_secret = val;
    }
    if let Some(val) = first(&["HR_JWT_EXPIRES_IN", "JWT_EXPIRES_IN"]) {
        config.auth.token_expiry_secs = parse_duration_secs(&val)
            .ok_or_else(|| ConfigError::EnvError(format!("invalid token expiry: {}", val)))?;
    }
    if let Some(val) = lookup("HR_JWT_ISSUER") {
        config.auth.issuer = val;
    }
    if let Some(val) = lookup("HR_COOKIE_SECURE") {
        config.auth.cookie_secure = parse_bool(&val, config.auth.cookie_secure);
    }

    // Password
    if let Some(val) = lookup("HR_PASSWORD_MIN_LENGTH") {
        if let Ok(len) = val.parse() {
            config.password.min_length = len;
        }
    }

    // Transaction
    if let Some(val) = lookup("HR_TRANSACTION_TIMEOUT_MS") {
        if let Ok(ms) = val.parse() {
            config.transaction.timeout_ms = ms;
        }
    }

    // Bootstrap account
    if let Some(val) = lookup("HR_BOOTSTRAP_NAME") {
        config.bootstrap.name = val;
    }
    if let Some(val) = lookup("HR_BOOTSTRAP_USERNAME") {
        config.bootstrap.username = val;
    }
    if let Some(val) = lookup("HR_BOOTSTRAP_EMAIL") {
        config.bootstrap.email = val;
    }
    if let Some(val) = lookup("HR_BOOTSTRAP_PHONE") {
        config.bootstrap.phone = val;
    }
    if let Some(val) = lookup("HR_BOOTSTRAP_PASSWORD") {
        config.bootstrap.password = val;
    }

    // General
    if let Some(val) = lookup("HR_DEV_MODE") {
        config.dev_mode = parse_bool(&val, config.dev_mode);
    }

    Ok(())
}

fn parse_bool(value: &str, fallback: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

/// Parse a duration such as `90d`, `12h`, `30m`, `45s` or bare seconds.
pub fn parse_duration_secs(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (digits, multiplier) = match value.chars().last()? {
        'd' | 'D' => (&value[..value.len() - 1], 86_400),
        'h' | 'H' => (&value[..value.len() - 1], 3_600),
        'm' | 'M' => (&value[..value.len() - 1], 60),
        's' | 'S' => (&value[..value.len() - 1], 1),
        _ => (value, 1),
    };

    let amount: u64 = digits.trim().parse().ok()?;
    amount.checked_mul(multiplier).filter(|secs| *secs > 0)
}
