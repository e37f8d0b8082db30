//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh `MemoryStore`. Users are
//! seeded straight into the store with tokens issued directly, so only the
//! auth tests pay for password hashing.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookshelf_api::app::{build_router, AppState};
use bookshelf_api::config::Config;
use bookshelf_shared::auth::jwt::issue_token;
use bookshelf_shared::models::user::{CreateUser, User};
use bookshelf_shared::store::{MemoryStore, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// A seeded account and its bearer token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> String {
        self.user.id.to_string()
    }
}

/// Test context containing the router and its store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })
        .expect("test config");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config.clone()));

        Self { store, app, config }
    }

    /// Inserts a user without going through signup
    pub async fn seed_user(&self, name: &str) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4()),
                password_hash: "unused".to_string(),
            })
            .await
            .expect("seed user");

        let token = issue_token(user.id, TEST_SECRET, 1).expect("issue token");

        TestUser { user, token }
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Non-JSON bodies come back as `Value::Null`.
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
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.app.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Adds a book through the API and returns its JSON
    pub async fn add_book(
        &self,
        owner: &TestUser,
        title: &str,
        author: &str,
        genre: &str,
        year: i32,
    ) -> Value {
        let (status, body) = self
            .post(
                "/api/books",
                Some(&owner.token),
                json!({
                    "title": title,
                    "author": author,
                    "description": format!("{} by {}, a long enough description.", title, author),
                    "genre": genre,
                    "publishedYear": year,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add book failed: {body}");

        body["data"].clone()
    }

    /// Reviews a book through the API and returns the review JSON
    pub async fn add_review(&self, reviewer: &TestUser, book_id: &str, rating: i32) -> Value {
        let (status, body) = self
            .post(
                "/api/reviews",
                Some(&reviewer.token),
                json!({
                    "bookId": book_id,
                    "rating": rating,
                    "reviewText": format!("I would give this one {} stars.", rating),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add review failed: {body}");

        body["data"].clone()
    }

    /// Current rating fields of a book as `(averageRating, totalReviews)`
    pub async fn rating_of(&self, book_id: &str) -> (f64, i64) {
        let (status, body) = self.get(&format!("/api/books/{}", book_id), None).await;
        assert_eq!(status, StatusCode::OK, "get book failed: {body}");

        (
            body["data"]["averageRating"].as_f64().expect("averageRating"),
            body["data"]["totalReviews"].as_i64().expect("totalReviews"),
        )
    }
}

/// String id of an entity JSON object
pub fn id_of(entity: &Value) -> String {
    entity["id"].as_str().expect("entity id").to_string()
}
