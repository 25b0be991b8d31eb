//! Principal REST endpoints
//!
//! The same five handlers serve every principal kind; the router for a
//! kind carries that kind in its state.
//!
//! - `POST   /api/{kind}`      create (201)
//! - `GET    /api/{kind}`      list, newest first
//! - `GET    /api/{kind}/:id`  read
//! - `PATCH  /api/{kind}/:id`  partial update
//! - `DELETE /api/{kind}/:id`  delete (204)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::directory::DirectoryBackend;
use super::entity::{Principal, PrincipalKind, PrincipalProfile, PrincipalStatus};
use super::fields::PrincipalFields;
use super::operations::{
    CreatePrincipalCommand, CreatePrincipalUseCase, DeletePrincipalCommand, DeletePrincipalUseCase,
    PrincipalQueries, UpdatePrincipalCommand, UpdatePrincipalUseCase,
};
use crate::shared::api_common::SuccessEnvelope;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;

/// Principal as returned over HTTP. Never includes credential material.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub status: PrincipalStatus,
    #[serde(flatten)]
    pub profile: PrincipalProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            name: p.name,
            username: p.username,
            email: p.email,
            phone: p.phone,
            status: p.status,
            profile: p.profile,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

pub struct PrincipalServices {
    pub create: CreatePrincipalUseCase<DirectoryBackend>,
    pub update: UpdatePrincipalUseCase<DirectoryBackend>,
    pub delete: DeletePrincipalUseCase<DirectoryBackend>,
    pub queries: PrincipalQueries<DirectoryBackend>,
}

#[derive(Clone)]
pub struct PrincipalsState {
    pub kind: PrincipalKind,
    pub services: Arc<PrincipalServices>,
}

/// Request bodies are parsed here so malformed input gets the JSON error
/// envelope instead of axum's plain-text rejection.
pub(crate) fn parse_fields(body: serde_json::Value) -> Result<PrincipalFields, PlatformError> {
    serde_json::from_value(body)
        .map_err(|e| PlatformError::validation(format!("Invalid input data: {}", e)))
}

async fn create_principal(
    State(state): State<PrincipalsState>,
    auth: Authenticated,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, PlatformError> {
    auth.require_admin()?;
    let fields = parse_fields(body)?;

    let command = CreatePrincipalCommand {
        kind: state.kind,
        fields,
    };
    let created = state
        .services
        .create
        .execute(command, auth.execution_context())
        .await
        .into_result()?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessEnvelope::new(PrincipalResponse::from(created))),
    ))
}

async fn list_principals(
    State(state): State<PrincipalsState>,
    auth: Authenticated,
) -> Result<Json<SuccessEnvelope<Vec<PrincipalResponse>>>, PlatformError> {
    auth.require_admin()?;
    let principals = state.services.queries.list(state.kind).await.into_result()?;
    debug!(kind = %state.kind, count = principals.len(), "Listed principals");

    Ok(Json(SuccessEnvelope::list(
        principals.into_iter().map(PrincipalResponse::from).collect(),
    )))
}

async fn get_principal(
    State(state): State<PrincipalsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessEnvelope<PrincipalResponse>>, PlatformError> {
    auth.require_admin()?;
    let principal = state.services.queries.get(state.kind, &id).await.into_result()?;
    Ok(Json(SuccessEnvelope::new(principal.into())))
}

async fn update_principal(
    State(state): State<PrincipalsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SuccessEnvelope<PrincipalResponse>>, PlatformError> {
    auth.require_admin()?;
    let fields = parse_fields(body)?;

    let command = UpdatePrincipalCommand {
        kind: state.kind,
        id,
        fields,
    };
    let updated = state
        .services
        .update
        .execute(command, auth.execution_context())
        .await
        .into_result()?;
    Ok(Json(SuccessEnvelope::new(updated.into())))
}

async fn delete_principal(
    State(state): State<PrincipalsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    auth.require_admin()?;
    let command = DeletePrincipalCommand {
        kind: state.kind,
        id,
    };
    state
        .services
        .delete
        .execute(command, auth.execution_context())
        .await
        .into_result()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Routes for one principal kind, relative to its collection path.
pub fn principals_router(state: PrincipalsState) -> Router {
    Router::new()
        .route("/", post(create_principal).get(list_principals))
        .route(
            "/:id",
            get(get_principal)
                .patch(update_principal)
                .delete(delete_principal),
        )
        .with_state(state)
}

/// `/api/employees`, `/api/ceos`, `/api/departments`, `/api/hr-managers`.
pub fn all_principals_router(services: Arc<PrincipalServices>) -> Router {
    PrincipalKind::ALL.into_iter().fold(Router::new(), |router, kind| {
        router.nest(
            &format!("/api/{}", kind.path_segment()),
            principals_router(PrincipalsState {
                kind,
                services: Arc::clone(&services),
            }),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::entity::{Address, Benefits, EmployeeProfile};
    use chrono::NaiveDate;

    #[test]
    fn test_response_hides_secret_and_flattens_profile() {
        let mut p = Principal::new(
            "Ada Lovelace",
            PrincipalProfile::Employee(EmployeeProfile {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                job_title: "Engineer".to_string(),
                department_id: None,
                salary: 5000.0,
                hire_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                benefits: Benefits::default(),
                address: Address::default(),
            }),
        );
        p.password_hash = Some("$argon2id$stub".to_string());

        let json = serde_json::to_value(PrincipalResponse::from(p)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["kind"], "EMPLOYEE");
        assert_eq!(json["attributes"]["jobTitle"], "Engineer");
        assert_eq!(json["attributes"]["hireDate"], "2024-01-15");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_parse_fields_rejects_bad_types() {
        let err = parse_fields(serde_json::json!({ "salary": "lots" })).unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));
    }
}
