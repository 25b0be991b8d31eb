//! API Middleware
//!
//! Authentication for axum handlers. A request carries its token either as
//! a Bearer header or in the session cookie. The token only names a
//! principal, so the extractor re-reads that principal on every request.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::auth::auth_service::{extract_bearer_token, AuthService};
use crate::principal::directory::{Directory, DirectoryBackend};
use crate::principal::entity::Principal;
use crate::shared::error::PlatformError;
use crate::usecase::ExecutionContext;

pub const DEFAULT_SESSION_COOKIE: &str = "hr_session";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// State the extractors need; injected into request extensions by [`AuthLayer`].
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub directory: Arc<DirectoryBackend>,
    pub session_cookie_name: String,
}

/// The current, still-existing, active principal.
pub struct Authenticated {
    pub principal: Principal,
    pub correlation_id: Option<String>,
}

impl Authenticated {
    /// HR managers and CEOs administer principals.
    pub fn require_admin(&self) -> Result<(), PlatformError> {
        if self.principal.kind().is_administrative() {
            Ok(())
        } else {
            Err(PlatformError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }

    pub fn execution_context(&self) -> ExecutionContext {
        match &self.correlation_id {
            Some(correlation) => {
                ExecutionContext::with_correlation(self.principal.id.clone(), correlation.clone())
            }
            None => ExecutionContext::create(self.principal.id.clone()),
        }
    }
}

pub(crate) fn request_id(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn extract_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .map(String::from);

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| PlatformError::internal("Auth state not configured"))?;

        let token = extract_token(parts, &app_state.session_cookie_name).ok_or_else(|| {
            PlatformError::unauthorized("You are not logged in! Please log in to get access.")
        })?;

        let subject = app_state.auth_service.verify_token(&token)?;

        let principal = app_state
            .directory
            .get(subject.kind, &subject.id)
            .await?
            .ok_or_else(|| {
                PlatformError::unauthorized("The user belonging to this token no longer exists.")
            })?;

        if !principal.is_active() {
            return Err(PlatformError::forbidden("This account is inactive."));
        }

        Ok(Authenticated {
            principal,
            correlation_id: request_id(parts),
        })
    }
}

/// Layer that injects [`AppState`] into request extensions.
#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());
        Box::pin(self.inner.call(req))
    }
}
