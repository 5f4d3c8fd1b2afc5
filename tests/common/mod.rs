#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use elearning::identity::StaticIdentityProvider;
use elearning::models::{AuthUser, Role};
use elearning::storage::MemoryBlobStore;
use elearning::{AppState, app, db};

pub const ADMIN: &str = "admin-token";
pub const INSTRUCTOR: &str = "instructor-token";
pub const OTHER_INSTRUCTOR: &str = "other-instructor-token";
pub const ALICE: &str = "alice-token";
pub const BOB: &str = "bob-token";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create test database");

    let identity = StaticIdentityProvider::new()
        .with_user(ADMIN, AuthUser::new("admin-1", Role::Admin))
        .with_user(INSTRUCTOR, AuthUser::new("instructor-1", Role::Instructor))
        .with_user(OTHER_INSTRUCTOR, AuthUser::new("instructor-2", Role::Instructor))
        .with_user(ALICE, AuthUser::new("alice", Role::Student))
        .with_user(BOB, AuthUser::new("bob", Role::Student));

    let state = AppState {
        db: pool,
        identity: Arc::new(identity),
        storage: Arc::new(MemoryBlobStore::new()),
    };

    TestApp {
        router: app(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, token, None).await
    }

    pub async fn create_category(&self) -> String {
        let (status, body) = self
            .post(
                "/categories",
                Some(ADMIN),
                json!({ "name": format!("Category {}", uuid::Uuid::new_v4()), "description": "Code" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_course(&self, extra: Value) -> String {
        let category_id = self.create_category().await;
        let mut payload = json!({
            "title": "Rust for Beginners",
            "description": "Ownership and borrowing",
            "category_id": category_id,
        });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }
        let (status, body) = self.post("/courses", Some(INSTRUCTOR), payload).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_module(&self, course_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/courses/{}/modules", course_id),
                Some(INSTRUCTOR),
                json!({ "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_section(&self, module_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/modules/{}/sections", module_id),
                Some(INSTRUCTOR),
                json!({ "title": title, "description": "Read this first" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_lesson(&self, section_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/sections/{}/lessons", section_id),
                Some(INSTRUCTOR),
                json!({ "title": title, "content_type": "text", "content": { "body": title } }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn publish(&self, course_id: &str) {
        let (status, body) = self
            .post(&format!("/courses/{}/publish", course_id), Some(INSTRUCTOR), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    /// Published course with one module, one section and `lessons` lessons.
    pub async fn published_course(&self, lessons: usize, extra: Value) -> (String, String, Vec<String>) {
        let course_id = self.create_course(extra).await;
        let module_id = self.create_module(&course_id, "Basics").await;
        let section_id = self.create_section(&module_id, "Getting started").await;
        let mut lesson_ids = Vec::new();
        for i in 0..lessons {
            lesson_ids.push(self.create_lesson(&section_id, &format!("Lesson {}", i + 1)).await);
        }
        self.publish(&course_id).await;
        (course_id, section_id, lesson_ids)
    }
}
