#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use homebuild_server::{
    app,
    config::Config,
    db::{
        models::{Project, Role},
        Database,
    },
    middleware::auth::{AuthUser, Session},
    routes::auth::{create_account, start_session},
    services::{
        blobs::LocalBlobStore,
        projects::{NewProject, ProjectRegistry},
    },
    AppState,
};

pub const PUBLIC_URL: &str = "http://homebuild.test";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub config: Config,
    pub blobs: TempDir,
}

/// Build a test `Config` pointing blob storage at `storage_path`.
pub fn test_config(storage_path: &str) -> Config {
    Config {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        storage_path: storage_path.to_string(),
        jwt_secret: "test-secret".to_string(),
        public_url: PUBLIC_URL.to_string(),
        session_ttl_days: 1,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Build the full application router around `pool`, with blobs in a
/// temporary directory that lives as long as the returned `TestApp`.
pub fn build_test_app(pool: SqlitePool) -> TestApp {
    let blobs = tempfile::tempdir().expect("temp dir");
    let storage_path = blobs.path().to_string_lossy().to_string();
    let config = test_config(&storage_path);
    let store = LocalBlobStore::new(&storage_path, config.blob_base_url());

    let state = AppState {
        db: Database::from_pool(pool.clone()),
        config: config.clone(),
        blobs: Arc::new(store),
    };

    TestApp {
        router: app(state),
        pool,
        config,
        blobs,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.send(authed(Method::GET, uri, token, Body::empty()))
            .await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: Value) -> Response {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.send(authed(Method::DELETE, uri, token, Body::empty()))
            .await
    }

    pub async fn upload_slip(
        &self,
        uri: &str,
        token: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Response {
        let boundary = "homebuild-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Create a signed-in identity. Returns `(user_id, token)`.
    ///
    /// With a role, the account is registered through the API (which gives it
    /// a client profile) and then promoted. Without one, the account is
    /// written directly and has no profile at all.
    pub async fn sign_up(&self, name: &str, role: Option<Role>) -> (String, String) {
        let email = format!("{name}@homebuild.test");
        let Some(role) = role else {
            let id = Uuid::new_v4().to_string();
            create_account(&self.pool, &id, &email, name, "password123")
                .await
                .expect("account insert should succeed");
            let token = start_session(&self.pool, &self.config, &id, &email, name)
                .await
                .expect("session should start");
            return (id, token);
        };

        let response = self
            .post_json(
                "/api/auth/register",
                None,
                serde_json::json!({ "email": email, "name": name, "password": "password123" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "registration must succeed");
        let json = body_json(response).await;
        let id = json["user"]["id"].as_str().unwrap().to_string();
        let token = json["token"].as_str().unwrap().to_string();

        if role != Role::Client {
            sqlx::query("UPDATE users SET role = ? WHERE id = ?")
                .bind(role)
                .bind(&id)
                .execute(&self.pool)
                .await
                .expect("role update should succeed");
        }

        (id, token)
    }
}

fn authed(method: Method, uri: &str, token: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(body)
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// A session value for calling services directly.
pub fn session(user_id: &str, role: Option<Role>) -> Session {
    Session {
        id: format!("session-{user_id}"),
        user: AuthUser {
            id: user_id.to_string(),
            email: format!("{user_id}@homebuild.test"),
            name: user_id.to_string(),
        },
        role,
    }
}

pub fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
}

/// Insert a project created on January `created_day`, 2024.
pub async fn insert_project(pool: &SqlitePool, name: &str, created_day: u32) -> Project {
    ProjectRegistry::insert(
        pool,
        &NewProject {
            project_name: name.to_string(),
            project_code: format!("HBP-{name}"),
            location: "Bangkok".to_string(),
            total_price: 1_000_000.0,
        },
        day(created_day),
    )
    .await
    .expect("project insert should succeed")
}

pub async fn set_owner(pool: &SqlitePool, project_id: &str, owner_id: &str) {
    sqlx::query("UPDATE projects SET owner_id = ? WHERE id = ?")
        .bind(owner_id)
        .bind(project_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn assign_staff(pool: &SqlitePool, project_id: &str, user_id: &str) {
    ProjectRegistry::insert_staff(pool, project_id, user_id)
        .await
        .unwrap();
}
