//! HTTP API Integration Tests
//!
//! Drive the assembled router against the in-memory directory.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use hr_platform::auth::{Argon2Config, AuthConfig, PlainSecret};
use hr_platform::principal::{ensure_bootstrap_manager, BootstrapAccount, Directory};
use hr_platform::{DirectoryBackend, InMemoryDirectory, Platform, PlatformSettings, PrincipalKind};

const ADMIN_EMAIL: &str = "admin@corp.com";
const ADMIN_PASSWORD: &str = "admin-pass";

struct TestApp {
    router: Router,
    directory: Arc<DirectoryBackend>,
}

impl TestApp {
    async fn new() -> Self {
        let directory = Arc::new(DirectoryBackend::Memory(InMemoryDirectory::new()));
        let settings = PlatformSettings {
            auth: AuthConfig {
                secret_key: "integration-test-secret".to_string(),
                ..AuthConfig::default()
            },
            argon2: Argon2Config::testing(),
            session_cookie_secure: false,
            expose_reset_tokens: true,
            ..PlatformSettings::default()
        };
        let platform = Platform::build(Arc::clone(&directory), settings).unwrap();

        ensure_bootstrap_manager(
            directory.as_ref(),
            &platform.principals.create,
            BootstrapAccount {
                name: "Root Admin".to_string(),
                username: "root".to_string(),
                email: ADMIN_EMAIL.to_string(),
                phone: "555-0000".to_string(),
                password: PlainSecret::from(ADMIN_PASSWORD),
            },
        )
        .await
        .unwrap();

        Self {
            router: platform.router(),
            directory,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(&self, identifier: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identifier": identifier, "password": password })),
        )
        .await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn stored_hash(&self, kind: PrincipalKind, id: &str) -> Option<String> {
        self.directory
            .get_with_credentials(kind, id)
            .await
            .unwrap()
            .and_then(|p| p.password_hash)
    }
}

fn employee_body(email: &str, phone: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "username": format!("ada-{}", phone),
        "email": email,
        "phone": phone,
        "password": "employee-pass",
        "jobTitle": "Engineer",
        "salary": 5000.0,
        "hireDate": "2024-01-15"
    })
}

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_employee_lifecycle() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;

        // Create employee A
        let (status, body) = app
            .send(
                Method::POST,
                "/api/employees",
                Some(&admin),
                Some(employee_body("a@x.com", "111")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["name"], "Ada Lovelace");
        assert!(body["data"].get("passwordHash").is_none());
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let original_hash = app.stored_hash(PrincipalKind::Employee, &id).await.unwrap();

        // The same email in another collection is a conflict
        let (status, body) = app
            .send(
                Method::POST,
                "/api/hr-managers",
                Some(&admin),
                Some(json!({
                    "name": "Other Manager",
                    "username": "other",
                    "email": "A@X.com",
                    "phone": "222",
                    "password": "manager-pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "email or phone already in use");

        // Salary-only update keeps identity and hash
        let (status, body) = app
            .send(
                Method::PATCH,
                &format!("/api/employees/{}", id),
                Some(&admin),
                Some(json!({ "salary": 6000.0 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["attributes"]["salary"], 6000.0);
        assert_eq!(body["data"]["email"], "a@x.com");
        assert_eq!(body["data"]["phone"], "111");
        assert_eq!(
            app.stored_hash(PrincipalKind::Employee, &id).await.unwrap(),
            original_hash
        );

        // Rotation with the wrong current secret
        let (status, body) = app.login("111", "employee-pass").await;
        assert_eq!(status, StatusCode::OK);
        let employee_token = body["token"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(
                Method::PATCH,
                "/api/auth/password",
                Some(&employee_token),
                Some(json!({ "passwordCurrent": "wrong-pass", "password": "brand-new-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect old password");
        assert_eq!(
            app.stored_hash(PrincipalKind::Employee, &id).await.unwrap(),
            original_hash
        );

        // Delete, then the read is a 404
        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/api/employees/{}", id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app
            .send(
                Method::GET,
                &format!("/api/employees/{}", id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn test_list_returns_results_count() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;

        for (email, phone) in [("a@x.com", "111"), ("b@x.com", "222")] {
            let (status, _) = app
                .send(
                    Method::POST,
                    "/api/employees",
                    Some(&admin),
                    Some(employee_body(email, phone)),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = app
            .send(Method::GET, "/api/employees", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], 2);
        assert_eq!(body["data"][0]["email"], "b@x.com");
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/ceos",
                Some(&admin),
                Some(json!({ "name": "No Vision" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_without_token_are_unauthorized() {
        let app = TestApp::new().await;

        let (status, body) = app.send(Method::GET, "/api/employees", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "fail");

        let (status, _) = app
            .send(Method::GET, "/api/auth/me", Some("not-a-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_identifier_look_alike() {
        let app = TestApp::new().await;

        let (status_a, body_a) = app.login(ADMIN_EMAIL, "not-the-password").await;
        let (status_b, body_b) = app.login("ghost@corp.com", "whatever").await;

        assert_eq!(status_a, StatusCode::UNAUTHORIZED);
        assert_eq!(status_a, status_b);
        assert_eq!(body_a["message"], body_b["message"]);
    }

    #[tokio::test]
    async fn test_employee_cannot_administer_principals() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;
        app.send(
            Method::POST,
            "/api/employees",
            Some(&admin),
            Some(employee_body("a@x.com", "111")),
        )
        .await;

        let (_, body) = app.login("a@x.com", "employee-pass").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = app
            .send(Method::GET, "/api/employees", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["kind"], "EMPLOYEE");
    }

    #[tokio::test]
    async fn test_token_of_deleted_principal_is_rejected() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;
        let (_, body) = app
            .send(
                Method::POST,
                "/api/employees",
                Some(&admin),
                Some(employee_body("a@x.com", "111")),
            )
            .await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = app.login("111", "employee-pass").await;
        let token = body["token"].as_str().unwrap().to_string();

        app.send(
            Method::DELETE,
            &format!("/api/employees/{}", id),
            Some(&admin),
            None,
        )
        .await;

        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_inactive_principal_is_forbidden() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;
        let (_, body) = app
            .send(
                Method::POST,
                "/api/employees",
                Some(&admin),
                Some(employee_body("a@x.com", "111")),
            )
            .await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = app.login("a@x.com", "employee-pass").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/employees/{}", id),
                Some(&admin),
                Some(json!({ "status": "Inactive" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.login("a@x.com", "employee-pass").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rotation_issues_new_session() {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;

        let (status, body) = app
            .send(
                Method::PATCH,
                "/api/auth/password",
                Some(&admin),
                Some(json!({ "passwordCurrent": ADMIN_PASSWORD, "password": "rotated-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());

        let (status, _) = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.login(ADMIN_EMAIL, "rotated-pass").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forgot_and_reset_password() {
        let app = TestApp::new().await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({ "email": ADMIN_EMAIL })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let reset_token = body["resetToken"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(
                Method::PATCH,
                &format!("/api/auth/reset-password/{}", reset_token),
                None,
                Some(json!({ "password": "after-reset" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());

        // Single use
        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/auth/reset-password/{}", reset_token),
                None,
                Some(json!({ "password": "second-reset" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.login(ADMIN_EMAIL, "after-reset").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forgot_password_for_unknown_identifier() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({ "email": "ghost@corp.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "There is no user with that email or phone");
    }
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
    }
}
