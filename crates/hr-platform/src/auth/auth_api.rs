//! Auth API Endpoints
//!
//! - POST  /api/auth/login                  login, sets the session cookie
//! - POST  /api/auth/logout                 clears the session cookie
//! - GET   /api/auth/me                     current principal
//! - PATCH /api/auth/password               rotate own secret
//! - POST  /api/auth/forgot-password        issue a reset token
//! - PATCH /api/auth/reset-password/:token  set a new secret with a token

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::auth_service::AuthService;
use super::credential_service::PlainSecret;
use super::login::LoginService;
use super::password_rotation::{
    CompleteSecretResetUseCase, RequestSecretResetUseCase, RotateSecretCommand, RotateSecretUseCase,
};
use crate::principal::api::PrincipalResponse;
use crate::principal::directory::DirectoryBackend;
use crate::principal::entity::Principal;
use crate::shared::api_common::SuccessEnvelope;
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, DEFAULT_SESSION_COOKIE};
use crate::usecase::ExecutionContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    /// Email or phone, whichever the client has
    #[serde(default)]
    pub identifier: Option<String>,
    pub password: PlainSecret,
}

impl LoginRequest {
    fn identifier(&self) -> &str {
        self.identifier
            .as_deref()
            .or(self.email.as_deref())
            .or(self.phone.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateSecretRequest {
    pub password_current: PlainSecret,
    pub password: PlainSecret,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: PlainSecret,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: PrincipalResponse,
}

/// Body returned whenever a request ends with a fresh session token.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    pub token: String,
    pub data: UserData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Present only when tokens may be echoed (development)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(Clone)]
pub struct AuthApiState {
    pub login: Arc<LoginService<DirectoryBackend>>,
    pub rotate: Arc<RotateSecretUseCase<DirectoryBackend>>,
    pub request_reset: Arc<RequestSecretResetUseCase<DirectoryBackend>>,
    pub complete_reset: Arc<CompleteSecretResetUseCase<DirectoryBackend>>,
    pub auth_service: Arc<AuthService>,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    /// Return reset tokens in the response body; delivery is otherwise
    /// out of band.
    pub expose_reset_tokens: bool,
}

impl AuthApiState {
    pub fn new(
        login: Arc<LoginService<DirectoryBackend>>,
        rotate: Arc<RotateSecretUseCase<DirectoryBackend>>,
        request_reset: Arc<RequestSecretResetUseCase<DirectoryBackend>>,
        complete_reset: Arc<CompleteSecretResetUseCase<DirectoryBackend>>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self {
            login,
            rotate,
            request_reset,
            complete_reset,
            auth_service,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            session_cookie_secure: true,
            expose_reset_tokens: false,
        }
    }

    pub fn with_session_cookie(mut self, name: &str, secure: bool) -> Self {
        self.session_cookie_name = name.to_string();
        self.session_cookie_secure = secure;
        self
    }

    pub fn with_exposed_reset_tokens(mut self, expose: bool) -> Self {
        self.expose_reset_tokens = expose;
        self
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.session_cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(self.session_cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.auth_service.token_expiry_secs()))
            .build()
    }

    /// Issue a token for `principal`, set it as cookie and echo it in the body.
    fn start_session(
        &self,
        jar: CookieJar,
        principal: Principal,
        token: Option<String>,
    ) -> Result<(CookieJar, Json<SessionResponse>), PlatformError> {
        let token = match token {
            Some(t) => t,
            None => self.auth_service.issue_token(&principal)?,
        };
        let jar = jar.add(self.session_cookie(token.clone()));
        Ok((
            jar,
            Json(SessionResponse {
                status: "success",
                token,
                data: UserData {
                    user: principal.into(),
                },
            }),
        ))
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> Result<T, PlatformError> {
    serde_json::from_value(body)
        .map_err(|e| PlatformError::validation(format!("Invalid input data: {}", e)))
}

pub async fn login(
    State(state): State<AuthApiState>,
    jar: CookieJar,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, PlatformError> {
    let req: LoginRequest = parse(body)?;
    let outcome = state
        .login
        .login(req.identifier(), &req.password)
        .await
        .into_result()?;
    state.start_session(jar, outcome.principal, Some(outcome.token))
}

pub async fn logout(State(state): State<AuthApiState>, jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build((state.session_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();
    (jar.add(cookie), StatusCode::NO_CONTENT)
}

pub async fn me(auth: Authenticated) -> Json<SuccessEnvelope<PrincipalResponse>> {
    Json(SuccessEnvelope::new(auth.principal.into()))
}

pub async fn update_password(
    State(state): State<AuthApiState>,
    jar: CookieJar,
    auth: Authenticated,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, PlatformError> {
    let req: RotateSecretRequest = parse(body)?;
    let command = RotateSecretCommand {
        kind: auth.principal.kind(),
        id: auth.principal.id.clone(),
        current_secret: req.password_current,
        new_secret: req.password,
    };
    let principal = state
        .rotate
        .execute(command, auth.execution_context())
        .await
        .into_result()?;
    state.start_session(jar, principal, None)
}

pub async fn forgot_password(
    State(state): State<AuthApiState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ForgotPasswordResponse>, PlatformError> {
    let req: ForgotPasswordRequest = parse(body)?;
    let identifier = req.email.or(req.phone).unwrap_or_default();

    let issued = state
        .request_reset
        .execute(&identifier, ExecutionContext::system())
        .await
        .into_result()?;
    info!(principal_id = %issued.principal_id, "Reset token issued");

    Ok(Json(ForgotPasswordResponse {
        status: "success",
        message: "Token generated",
        reset_token: state.expose_reset_tokens.then_some(issued.token.token),
    }))
}

pub async fn reset_password(
    State(state): State<AuthApiState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, PlatformError> {
    let req: ResetPasswordRequest = parse(body)?;
    let principal = state
        .complete_reset
        .execute(&token, req.password, ExecutionContext::system())
        .await
        .into_result()?;
    state.start_session(jar, principal, None)
}

pub fn auth_router(state: AuthApiState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/password", patch(update_password))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", patch(reset_password))
        .with_state(state)
}
