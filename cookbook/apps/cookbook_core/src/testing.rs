//! In-process test harness: a throwaway SQLite database and media root per
//! test, plus helpers for driving a router without a socket.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::models::user;
use crate::settings::{PasswordCfg, Settings};
use crate::users::{create_user, NewUser};
use crate::{connect, ensure_schema, tokens, AppState};

pub struct TestApp {
    pub state: AppState,
    // keeps the database file and uploads alive for the test's duration
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let settings = Settings {
            database_url: format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite3").display()),
            media_root: dir.path().join("media"),
            password: PasswordCfg {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            ..Settings::default()
        };
        let db = connect(&settings).await.expect("connect test database");
        ensure_schema(&db).await.expect("migrate test database");
        Self {
            state: AppState::new(db, settings),
            dir,
        }
    }

    /// Mounts `router` on this app's state.
    pub fn client(&self, router: Router<AppState>) -> TestClient {
        TestClient {
            router: router.with_state(self.state.clone()),
        }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> user::Model {
        create_user(
            &self.state.db,
            &self.state.settings.password,
            NewUser {
                email,
                password,
                name: "",
            },
        )
        .await
        .expect("create test user")
    }

    pub async fn token_for(&self, user: &user::Model) -> String {
        tokens::get_or_create_token(&self.state.db, user.id)
            .await
            .expect("issue test token")
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.expect("infallible");
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse { status, body }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {t}"));
        }
        let req = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");
        self.send(req).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.json(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.json(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.json(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.json(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.json(Method::DELETE, uri, token, None).await
    }

    /// Sends a single-file multipart form.
    pub async fn upload(
        &self,
        uri: &str,
        token: Option<&str>,
        field: &str,
        filename: &str,
        content: &[u8],
    ) -> TestResponse {
        const BOUNDARY: &str = "cookbook-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {t}"));
        }
        self.send(builder.body(Body::from(body)).expect("build request"))
            .await
    }
}
