#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use church_registry::config::AppConfig;
use church_registry::database::{DocumentStore, MemoryDocumentStore};
use church_registry::models::{Role, User};
use church_registry::{app, AppState};

pub const PREFIX: &str = "/api/v1";

/// The real router over an in-memory store, driven without a socket.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> String {
        self.body["data"]["id"].as_str().unwrap_or_default().to_string()
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::development())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryDocumentStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let state = AppState::new(config, store).expect("test state");
        let router = app(state.clone());
        Self { state, router }
    }

    /// Stores an account directly and mints a token for it. Skips password hashing.
    pub async fn user_token(&self, role: Role, wereda: Option<Uuid>) -> Result<String> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: format!("user-{}", Uuid::new_v4().simple()),
            password_hash: "not-a-real-hash".to_string(),
            role,
            wereda_unit: wereda,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        self.state.repos.users.insert(&user).await?;
        Ok(self.state.keys.issue(user.id, role, wereda)?)
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.user_token(Role::Admin, None).await
    }

    pub async fn wereda_admin_token(&self, wereda: &str) -> Result<String> {
        let wereda = Uuid::parse_str(wereda).context("wereda id")?;
        self.user_token(Role::WeredaAdmin, Some(wereda)).await
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?
        };
        Ok(TestResponse { status, body })
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, &api(path), Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, &api(path), Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, &api(path), Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PATCH, &api(path), Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::DELETE, &api(path), Some(token), None).await
    }

    pub async fn create_wereda(&self, token: &str, name: &str) -> Result<String> {
        let res = self.post("/wereda-units", token, wereda_body(name)).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "wereda create failed: {}", res.body);
        Ok(res.id())
    }

    pub async fn create_parish(&self, token: &str, name: &str, under: &str) -> Result<String> {
        let res = self.post("/parishes", token, parish_body(name, under)).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "parish create failed: {}", res.body);
        Ok(res.id())
    }

    pub async fn create_member(&self, token: &str, body: Value) -> Result<String> {
        let res = self.post("/members", token, body).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "member create failed: {}", res.body);
        Ok(res.id())
    }
}

pub fn api(path: &str) -> String {
    format!("{}{}", PREFIX, path)
}

pub fn wereda_body(name: &str) -> Value {
    json!({
        "name": name,
        "address": {
            "region": "Amhara",
            "zone": "West Gojjam",
            "woreda": "Bahir Dar Zuria",
            "kebele": "01"
        }
    })
}

pub fn parish_body(name: &str, under: &str) -> Value {
    json!({
        "name": name,
        "address": { "region": "Amhara" },
        "under": under
    })
}

pub fn member_body(first_name: &str, gender: &str, parish: &str) -> Value {
    json!({
        "firstName": first_name,
        "fatherName": "Kebede",
        "gender": gender,
        "dateOfBirth": "1990-05-10",
        "parish": parish
    })
}

/// One wereda unit with one parish, created by an admin.
pub struct Hierarchy {
    pub admin: String,
    pub wereda: String,
    pub parish: String,
}

pub async fn hierarchy(app: &TestApp, tag: &str) -> Result<Hierarchy> {
    let admin = app.admin_token().await?;
    let wereda = app.create_wereda(&admin, &format!("Wereda {}", tag)).await?;
    let parish = app.create_parish(&admin, &format!("Parish {}", tag), &wereda).await?;
    Ok(Hierarchy { admin, wereda, parish })
}
