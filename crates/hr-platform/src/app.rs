//! Application Assembly
//!
//! Wires a directory backend into the use cases and HTTP routers. The
//! server binary and the HTTP tests both build their router here.

use axum::{response::Json, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    auth_router, Argon2Config, AuthApiState, AuthConfig, AuthService, CompleteSecretResetUseCase,
    CredentialService, LoginService, PasswordPolicy, RequestSecretResetUseCase,
    RotateSecretUseCase,
};
use crate::principal::operations::{
    CreatePrincipalUseCase, DeletePrincipalUseCase, PrincipalQueries, UpdatePrincipalUseCase,
};
use crate::principal::{all_principals_router, DirectoryBackend, PrincipalServices};
use crate::shared::error::Result;
use crate::shared::middleware::{AppState, AuthLayer, DEFAULT_SESSION_COOKIE};
use crate::usecase::UnitOfWork;

/// Everything the platform needs besides storage.
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub auth: AuthConfig,
    pub argon2: Argon2Config,
    pub password_policy: PasswordPolicy,
    pub reset_token_validity: chrono::Duration,
    pub transaction_timeout: Duration,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    /// Echo reset tokens in the forgot-password response
    pub expose_reset_tokens: bool,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            argon2: Argon2Config::default(),
            password_policy: PasswordPolicy::default(),
            reset_token_validity: chrono::Duration::minutes(10),
            transaction_timeout: Duration::from_secs(5),
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            session_cookie_secure: true,
            expose_reset_tokens: false,
        }
    }
}

/// Assembled services over one directory backend.
pub struct Platform {
    pub directory: Arc<DirectoryBackend>,
    pub auth_service: Arc<AuthService>,
    pub credentials: Arc<CredentialService>,
    pub principals: Arc<PrincipalServices>,
    pub auth_api: AuthApiState,
    session_cookie_name: String,
}

impl Platform {
    pub fn build(directory: Arc<DirectoryBackend>, settings: PlatformSettings) -> Result<Self> {
        let credentials = Arc::new(CredentialService::new(
            settings.argon2,
            settings.password_policy,
            settings.reset_token_validity,
        )?);
        let auth_service = Arc::new(AuthService::new(settings.auth));
        let unit_of_work = UnitOfWork::new(Arc::clone(&directory), settings.transaction_timeout);

        let principals = Arc::new(PrincipalServices {
            create: CreatePrincipalUseCase::new(unit_of_work.clone(), Arc::clone(&credentials)),
            update: UpdatePrincipalUseCase::new(unit_of_work.clone(), Arc::clone(&credentials)),
            delete: DeletePrincipalUseCase::new(unit_of_work.clone()),
            queries: PrincipalQueries::new(Arc::clone(&directory)),
        });

        let auth_api = AuthApiState::new(
            Arc::new(LoginService::new(
                Arc::clone(&directory),
                Arc::clone(&credentials),
                Arc::clone(&auth_service),
            )),
            Arc::new(RotateSecretUseCase::new(
                unit_of_work.clone(),
                Arc::clone(&credentials),
            )),
            Arc::new(RequestSecretResetUseCase::new(
                unit_of_work.clone(),
                Arc::clone(&credentials),
            )),
            Arc::new(CompleteSecretResetUseCase::new(
                unit_of_work,
                Arc::clone(&credentials),
            )),
            Arc::clone(&auth_service),
        )
        .with_session_cookie(&settings.session_cookie_name, settings.session_cookie_secure)
        .with_exposed_reset_tokens(settings.expose_reset_tokens);

        Ok(Self {
            directory,
            auth_service,
            credentials,
            principals,
            auth_api,
            session_cookie_name: settings.session_cookie_name,
        })
    }

    /// All API routes behind the auth layer, plus `/health`.
    pub fn router(&self) -> Router {
        let app_state = AppState {
            auth_service: Arc::clone(&self.auth_service),
            directory: Arc::clone(&self.directory),
            session_cookie_name: self.session_cookie_name.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .nest("/api/auth", auth_router(self.auth_api.clone()))
            .merge(all_principals_router(Arc::clone(&self.principals)))
            .layer(AuthLayer::new(app_state))
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
