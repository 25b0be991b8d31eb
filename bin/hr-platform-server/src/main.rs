//! HR Platform Server
//!
//! Serves the principal, authentication and health APIs.
//!
//! Configuration comes from a TOML file (`HR_CONFIG`, `config.toml`, ...)
//! with `HR_*` environment overrides; see `hr_config::AppConfig`.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HR_CONFIG` | - | Path to the TOML config file |
//! | `HR_STORAGE_BACKEND` | `mongodb` | `mongodb` or `memory` |
//! | `HR_JWT_SECRET` | - | Token signing secret (required outside dev mode) |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use rand::RngCore;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use hr_config::{AppConfig, ConfigLoader, StorageBackend};
use hr_platform::auth::{Argon2Config, AuthConfig, PasswordPolicy, PlainSecret};
use hr_platform::principal::{ensure_bootstrap_manager, BootstrapAccount};
use hr_platform::{
    initialize_indexes, DirectoryBackend, InMemoryDirectory, Platform, PlatformSettings,
    PrincipalRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    hr_common::logging::init_logging("hr-platform-server");

    info!("Starting HR Platform Server");

    let config = ConfigLoader::new().load()?;
    config.validate()?;

    let directory = Arc::new(connect_directory(&config).await?);
    let platform = Platform::build(Arc::clone(&directory), settings_from(&config))?;

    if config.bootstrap.is_configured() {
        let account = BootstrapAccount {
            name: config.bootstrap.name.clone(),
            username: config.bootstrap.username.clone(),
            email: config.bootstrap.email.clone(),
            phone: config.bootstrap.phone.clone(),
            password: PlainSecret::new(config.bootstrap.password.clone()),
        };
        match ensure_bootstrap_manager(directory.as_ref(), &platform.principals.create, account)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => info!("HR manager already present, bootstrap skipped"),
            Err(e) => warn!(error = %e, "Bootstrap HR manager not created"),
        }
    }

    let app = platform
        .router()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HR Platform Server shutdown complete");
    Ok(())
}

async fn connect_directory(config: &AppConfig) -> Result<DirectoryBackend> {
    match config.storage.backend {
        StorageBackend::Mongodb => {
            info!("Connecting to MongoDB: {}", config.mongodb.database);
            let client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
            let db = client.database(&config.mongodb.database);
            initialize_indexes(&db).await?;
            Ok(DirectoryBackend::Mongo(PrincipalRepository::new(&db)))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all data is lost on shutdown");
            Ok(DirectoryBackend::Memory(InMemoryDirectory::new()))
        }
    }
}

fn settings_from(config: &AppConfig) -> PlatformSettings {
    let secret_key = if config.auth.jwt_secret.is_empty() {
        warn!("No token secret configured; generated an ephemeral dev secret");
        random_secret()
    } else {
        config.auth.jwt_secret.clone()
    };

    PlatformSettings {
        auth: AuthConfig {
            secret_key,
            issuer: config.auth.issuer.clone(),
            audience: config.auth.audience.clone(),
            token_expiry_secs: i64::try_from(config.auth.token_expiry_secs).unwrap_or(i64::MAX),
        },
        argon2: Argon2Config {
            memory_cost: config.password.argon2_memory_kib,
            time_cost: config.password.argon2_iterations,
            parallelism: config.password.argon2_parallelism,
        },
        password_policy: PasswordPolicy {
            min_length: config.password.min_length,
            max_length: config.password.max_length,
        },
        reset_token_validity: chrono::Duration::minutes(config.password.reset_token_validity_mins),
        transaction_timeout: Duration::from_millis(config.transaction.timeout_ms),
        session_cookie_name: config.auth.cookie_name.clone(),
        session_cookie_secure: config.auth.cookie_secure,
        expose_reset_tokens: config.dev_mode,
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received...");
}
