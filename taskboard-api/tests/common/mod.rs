//! Shared helpers for the API integration tests
//!
//! Tests run against the PostgreSQL database named by `DATABASE_URL` and
//! skip themselves when it is unset or unreachable. Every test registers
//! fresh users with unique emails, so tests can share one database and run
//! in parallel.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use taskboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskboard_shared::db::migrations::run_migrations;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Sup3r-Secret!";

const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

/// A registered user and their access token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestContext {
    /// Connects and migrates, or returns `None` when no database is available
    pub async fn try_new() -> Option<Self> {
        dotenvy::dotenv().ok();

        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };

        let db = match PgPool::connect(&url).await {
            Ok(db) => db,
            Err(e) => {
                eprintln!("database unreachable ({}), skipping", e);
                return None;
            }
        };

        run_migrations(&db).await.expect("migrations should apply");

        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.clone()),
            "JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
            "RUN_MIGRATIONS" => Some("false".to_string()),
            _ => None,
        })
        .expect("test config should be valid");

        let app = build_router(AppState::new(db.clone(), config));

        Some(Self { db, app })
    }

    /// Sends one request and returns the status and JSON body (`Null` when empty)
    pub async fn send(
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

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Registers a user with a unique email
    pub async fn register(&self, name: &str) -> TestUser {
        let email = unique_email(name);

        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "name": name,
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a project owned by `owner` and returns its id
    pub async fn create_project(&self, owner: &TestUser, title: &str) -> String {
        let (status, body) = self
            .post("/projects", owner, json!({ "title": title }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);

        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a task and returns its JSON view
    pub async fn create_task(&self, owner: &TestUser, project_id: &str, extra: Value) -> Value {
        let mut body = json!({ "project_id": project_id, "title": "Write tests" });
        if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
            target.extend(fields);
        }

        let (status, body) = self.post("/tasks", owner, body).await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);

        body
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}@example.com",
        prefix.to_lowercase().replace(' ', "-"),
        Uuid::new_v4()
    )
}

/// Ids of the `results` array of a list response
pub fn result_ids(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
