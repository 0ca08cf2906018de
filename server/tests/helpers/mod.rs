//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router, backed by the in-memory record and key-value stores, plus helpers
//! for seeding principals and logging in.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sg_server::api::{create_router, AppState};
use sg_server::auth::password::hash_password;
use sg_server::config::Config;
use sg_server::db::{Admin, MemoryKv, MemoryRecordStore, NewAdmin, NewUser, RecordStore, Role, User};
use tower::ServiceExt;
use uuid::Uuid;

/// Password used for every seeded principal.
pub const TEST_PASSWORD: &str = "Secret123";

/// Full router over in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub records: Arc<MemoryRecordStore>,
    pub kv: Arc<MemoryKv>,
}

impl TestApp {
    /// Create a test app with the default test config.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let records = Arc::new(MemoryRecordStore::new());
        let kv = Arc::new(MemoryKv::new());
        let state = AppState::new(records.clone(), kv.clone(), config);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            records,
            kv,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Build a JSON request, optionally authenticated.
    pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Self::request(method, uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("Failed to build request")
    }

    /// Build a bodyless request, optionally authenticated.
    pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Self::request(method, uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).expect("Failed to build request")
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Create a role holding the named permissions, creating them as needed.
    pub async fn create_role(&self, name: &str, permissions: &[&str]) -> Role {
        let mut ids = Vec::with_capacity(permissions.len());
        for permission in permissions {
            let record = match self
                .records
                .find_permission_by_name(permission)
                .await
                .expect("permission lookup")
            {
                Some(record) => record,
                None => self
                    .records
                    .create_permission(permission)
                    .await
                    .expect("Failed to create permission"),
            };
            ids.push(record.id);
        }
        self.records
            .create_role(name, &ids)
            .await
            .expect("Failed to create role")
    }

    /// Create an admin with `TEST_PASSWORD`.
    pub async fn create_admin(&self, email: &str, role: Option<&str>, role_id: Option<Uuid>) -> Admin {
        let password_hash = hash_password(TEST_PASSWORD).await.expect("hash");
        self.records
            .create_admin(NewAdmin {
                email: email.to_string(),
                full_name: "Ada Admin".to_string(),
                password_hash,
                role: role.map(str::to_string),
                role_id,
            })
            .await
            .expect("Failed to create admin")
    }

    /// Create a user with `TEST_PASSWORD`.
    pub async fn create_user(&self, email: &str, role_id: Option<Uuid>) -> User {
        let password_hash = hash_password(TEST_PASSWORD).await.expect("hash");
        self.records
            .create_user(NewUser {
                email: email.to_string(),
                full_name: "Uma User".to_string(),
                password_hash,
                role_id,
                permission_ids: Vec::new(),
            })
            .await
            .expect("Failed to create user")
    }

    /// Log in through `path` and return the bearer token.
    pub async fn login(&self, path: &str, email: &str) -> String {
        let response = self
            .oneshot(Self::json_request(
                Method::POST,
                path,
                None,
                &serde_json::json!({ "email": email, "password": TEST_PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), 200, "login through {path} failed");
        let body = body_to_json(response).await;
        body["token"]
            .as_str()
            .expect("login response carries a token")
            .to_string()
    }

    pub async fn login_admin(&self, email: &str) -> String {
        self.login("/v1/admin/auth/login", email).await
    }

    pub async fn login_user(&self, email: &str) -> String {
        self.login("/v1/auth/login", email).await
    }
}

/// Read a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
