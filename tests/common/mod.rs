// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use eso_facility::config::Config;
use eso_facility::db::FirestoreDb;
use eso_facility::error::AppError;
use eso_facility::routes::create_router;
use eso_facility::services::eso_api::{ContainerItem, Credentials, ObservingRun};
use eso_facility::services::{Phase2Api, Phase2Connector};
use eso_facility::AppState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique name for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_username(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

// ─── Stub ESO API ────────────────────────────────────────────

/// In-process stand-in for the ESO Phase 2 API.
#[derive(Clone, Default)]
pub struct StubConnector {
    pub runs: Vec<ObservingRun>,
    /// Items per container id
    pub items: HashMap<i64, Vec<ContainerItem>>,
    /// Every call after login fails
    pub fail: bool,
    /// Credentials of each connect call
    pub seen: Arc<Mutex<Vec<Credentials>>>,
}

#[allow(dead_code)]
impl StubConnector {
    /// One run (60925315, container 1000) holding two folders and an OB;
    /// folder 1 holds two OBs.
    pub fn with_demo_data() -> Self {
        let mut items = HashMap::new();
        items.insert(
            1000,
            vec![
                folder(1, "FolderA"),
                folder(2, "FolderB"),
                observation_block(300, "Loose OB"),
            ],
        );
        items.insert(
            1,
            vec![
                observation_block(101, "Target 1"),
                observation_block(102, "Target 2"),
                folder(3, "Nested"),
            ],
        );

        Self {
            runs: vec![ObservingRun {
                run_id: 60925315,
                prog_id: "60.A-9252(M)".to_string(),
                telescope: "UT2".to_string(),
                instrument: "XSHOOTER".to_string(),
                container_id: 1000,
            }],
            items,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_demo_data()
        }
    }

    pub fn seen(&self) -> Vec<Credentials> {
        self.seen.lock().unwrap().clone()
    }
}

fn folder(id: i64, name: &str) -> ContainerItem {
    ContainerItem {
        item_type: ContainerItem::FOLDER.to_string(),
        name: name.to_string(),
        container_id: Some(id),
        ob_id: None,
    }
}

fn observation_block(id: i64, name: &str) -> ContainerItem {
    ContainerItem {
        item_type: ContainerItem::OBSERVATION_BLOCK.to_string(),
        name: name.to_string(),
        container_id: None,
        ob_id: Some(id),
    }
}

struct StubApi(StubConnector);

impl StubApi {
    fn check(&self) -> Result<(), AppError> {
        if self.0.fail {
            return Err(AppError::EsoApi("HTTP 503: unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Phase2Api for StubApi {
    async fn get_runs(&self) -> Result<Vec<ObservingRun>, AppError> {
        self.check()?;
        Ok(self.0.runs.clone())
    }

    async fn get_run(&self, run_id: i64) -> Result<ObservingRun, AppError> {
        self.check()?;
        self.0
            .runs
            .iter()
            .find(|r| r.run_id == run_id)
            .cloned()
            .ok_or_else(|| AppError::EsoApi("HTTP 404: run not found".to_string()))
    }

    async fn get_items(&self, container_id: i64) -> Result<Vec<ContainerItem>, AppError> {
        self.check()?;
        Ok(self.0.items.get(&container_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Phase2Connector for StubConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Phase2Api>, AppError> {
        self.seen.lock().unwrap().push(credentials.clone());
        Ok(Box::new(StubApi(self.clone())))
    }
}

// ─── Test App ────────────────────────────────────────────────

/// Create a test app backed by the in-memory store and the demo stub.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(StubConnector::with_demo_data())
}

#[allow(dead_code)]
pub fn create_test_app_with(connector: StubConnector) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        FirestoreDb::new_in_memory(),
        Arc::new(connector),
    ));
    (create_router(state.clone()), state)
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// POST an urlencoded form, optionally with a session cookie.
#[allow(dead_code)]
pub async fn post_form(app: &Router, uri: &str, cookie: Option<&str>, body: &str) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

/// GET with a session cookie; returns status and body.
#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str, cookie: &str) -> (StatusCode, String) {
    let response = send(
        app,
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let status = response.status();
    (status, body_string(response).await)
}

/// `eso_session=<jwt>` from a response's Set-Cookie headers.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("eso_session="))
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.to_string())
}

#[allow(dead_code)]
pub async fn register(app: &Router, username: &str, password: &str) -> Response {
    post_form(
        app,
        "/auth/register",
        None,
        &format!("username={username}&password={password}"),
    )
    .await
}

/// Log in and return the session cookie pair.
#[allow(dead_code)]
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = post_form(
        app,
        "/auth/login",
        None,
        &format!("username={username}&password={password}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed");
    session_cookie(&response).expect("login did not set a session cookie")
}

/// Register and log in.
#[allow(dead_code)]
pub async fn signed_in(app: &Router, username: &str, password: &str) -> String {
    let response = register(app, username, password).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    login(app, username, password).await
}

/// Save ESO credentials through the profile edit form.
#[allow(dead_code)]
pub async fn save_profile(
    app: &Router,
    cookie: &str,
    environment: &str,
    p2_username: &str,
    p2_password: &str,
) -> Response {
    post_form(
        app,
        "/eso/profile/edit/",
        Some(cookie),
        &format!("p2_environment={environment}&p2_username={p2_username}&p2_password={p2_password}"),
    )
    .await
}

/// Number of `<option>` elements in an HTML fragment.
#[allow(dead_code)]
pub fn option_count(html: &str) -> usize {
    html.matches("<option ").count()
}
