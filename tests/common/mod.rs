//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;
use uuid::Uuid;

use game_store::api::{self, AppState};
use game_store::domain::{FixedClock, Role};
use game_store::repository::{hash_api_key, InMemoryStore};

pub const ADMIN_KEY: &str = "admin_test_key";
pub const USER_KEY: &str = "user_test_key";

/// Router over an in-memory store with one admin key and one user key
pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn new(now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.insert_api_key(ADMIN_KEY, Role::Admin, None);
        store.insert_api_key(USER_KEY, Role::User, None);

        let app = api::create_app(AppState::in_memory(store.clone(), Arc::new(FixedClock(now))));
        Self { app, store }
    }

    /// Send a request and decode the JSON response body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        api_key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("X-API-Key", key);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(USER_KEY), None).await
    }

    pub async fn admin_post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(ADMIN_KEY), Some(body)).await
    }
}

/// Setup test database - truncate tables and seed the admin API key
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    sqlx::query(
        "TRUNCATE TABLE libraries, promotions, games, api_keys, users, queue_messages CASCADE",
    )
    .execute(&mut *tx)
    .await
    .expect("Failed to clean up DB");

    sqlx::query(
        r#"
        INSERT INTO api_keys (id, name, key_hash, role, is_active)
        VALUES ($1, 'Test admin key', $2, 'admin', TRUE)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(hash_api_key(ADMIN_KEY))
    .execute(&mut *tx)
    .await
    .expect("Failed to seed API key");

    tx.commit().await.expect("Failed to commit transaction");

    pool
}
