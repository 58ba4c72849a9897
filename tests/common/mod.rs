//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the full router over a fresh in-memory database,
//! sending every request as a fixed owner unless told otherwise.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use spendwise::auth::OWNER_HEADER;
use spendwise::config::{AnalyticsSettings, Config};
use spendwise::db::{create_in_memory_pool, migrations};
use spendwise::models::AiSettings;
use spendwise::server;
use spendwise::state::AppState;
use std::path::{Path, PathBuf};
use tower::ServiceExt;

pub const OWNER: &str = "owner-1";

pub struct TestClient {
    state: AppState,
    owner: Option<String>,
}

impl TestClient {
    /// Fresh in-memory database, default analytics settings, no AI provider.
    pub fn new() -> Self {
        Self::with_settings(AnalyticsSettings::default(), None)
    }

    pub fn with_settings(analytics: AnalyticsSettings, ai: Option<AiSettings>) -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        {
            let conn = pool.get().expect("Failed to get connection");
            migrations::run_migrations(&conn, Path::new("migrations"))
                .expect("Failed to run migrations");
        }

        let config = Config {
            host: "127.0.0.1".into(),
            port: 8000,
            database_path: PathBuf::from(":memory:"),
            migrations_path: PathBuf::from("migrations"),
            analytics,
            ai,
        };

        Self {
            state: AppState::new(pool, config),
            owner: Some(OWNER.to_string()),
        }
    }

    /// Same database, requests sent as `owner` (or anonymously with `None`).
    pub fn as_owner(&self, owner: Option<&str>) -> Self {
        Self {
            state: self.state.clone(),
            owner: owner.map(str::to_string),
        }
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    async fn send(&self, method: &str, uri: &str, body: Option<&Value>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = &self.owner {
            builder = builder.header(OWNER_HEADER, owner);
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send("GET", uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, String) {
        self.send("DELETE", uri, None).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, String) {
        self.send("POST", uri, Some(body)).await
    }

    /// GET and parse the body as JSON (`Value::Null` when it is not JSON).
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    pub async fn post_for_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let (status, body) = self.post_json(uri, body).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    // =========================================================================
    // Helpers for creating entries through the API
    // =========================================================================

    /// Add an income and return its id.
    pub async fn add_income(&self, source: &str, amount: f64, date: &str) -> i64 {
        let body = serde_json::json!({ "source": source, "amount": amount, "date": date });
        let (status, created) = self.post_for_json("/api/v1/income/add", &body).await;
        assert_eq!(status, StatusCode::OK, "add income failed: {}", created);
        created["id"].as_i64().expect("created income has an id")
    }

    /// Add an expense and return its id.
    pub async fn add_expense(&self, category: &str, amount: f64, date: &str) -> i64 {
        let body = serde_json::json!({ "category": category, "amount": amount, "date": date });
        let (status, created) = self.post_for_json("/api/v1/expense/add", &body).await;
        assert_eq!(status, StatusCode::OK, "add expense failed: {}", created);
        created["id"].as_i64().expect("created expense has an id")
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
