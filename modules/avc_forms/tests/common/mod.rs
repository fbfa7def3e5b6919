//! Shared fixtures: a fresh in-memory SQLite database per test with
//! migrations applied, the real router, and seeded identities.

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

use avc_forms::config::AvcFormsConfig;
use avc_forms::contract::model::{NewUser, User};
use avc_forms::AvcForms;

pub const PASSWORD: &str = "correct-horse-battery";

pub async fn create_test_db() -> DatabaseConnection {
    // A memory database lives per connection, so the pool must hold exactly one.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    AvcForms::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub module: AvcForms,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AvcFormsConfig::default()).await
    }

    pub async fn with_config(cfg: AvcFormsConfig) -> Self {
        let db = create_test_db().await;
        let module = AvcForms::new(db.clone(), &cfg);
        let router = module.router();
        Self { db, module, router }
    }

    /// Active account with [`PASSWORD`] and the given patient permissions.
    pub async fn seed_user(&self, username: &str, superuser: bool, perms: &[&str]) -> User {
        let mut new_user = NewUser::basic(username, PASSWORD);
        new_user.is_superuser = superuser;
        let user = self
            .module
            .users()
            .create_user(new_user)
            .await
            .expect("seed user");
        if perms.is_empty() {
            return user;
        }
        let codenames: Vec<String> = perms.iter().map(|p| p.to_string()).collect();
        self.module
            .users()
            .grant_permissions(username, &codenames)
            .await
            .expect("grant permissions")
    }

    /// Send a request as `username` (or anonymously) and decode the JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        username: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(username) = username {
            builder = builder.header(header::AUTHORIZATION, basic(username, PASSWORD));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
