// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO Phase 2 API client.
//!
//! A client is built per request from the caller's decrypted credentials and
//! dropped when the request ends. Nothing here is cached across requests.
//!
//! Handles:
//! - Login (username/password exchanged for a bearer token)
//! - Observing runs and container items
//! - Mapping API records to dropdown choices

use crate::error::AppError;
use crate::forms::Choice;
use crate::models::P2Environment;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// ESO login for one request. `Debug` hides the password.
#[derive(Clone)]
pub struct Credentials {
    pub environment: P2Environment,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("environment", &self.environment)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Observing run as returned by `GET /v1/obsRuns`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservingRun {
    pub run_id: i64,
    #[serde(default)]
    pub prog_id: String,
    #[serde(default)]
    pub telescope: String,
    #[serde(default)]
    pub instrument: String,
    pub container_id: i64,
}

impl ObservingRun {
    pub fn label(&self) -> String {
        format!("{} - {} - {}", self.prog_id, self.telescope, self.instrument)
    }
}

/// Entry of `GET /v1/containers/{id}/items`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerItem {
    pub item_type: String,
    #[serde(default)]
    pub name: String,
    /// Set for folders and other containers
    #[serde(default)]
    pub container_id: Option<i64>,
    /// Set for observation blocks
    #[serde(default)]
    pub ob_id: Option<i64>,
}

impl ContainerItem {
    pub const FOLDER: &'static str = "Folder";
    pub const OBSERVATION_BLOCK: &'static str = "OB";
}

/// An authenticated Phase 2 session.
#[async_trait]
pub trait Phase2Api: Send + Sync {
    async fn get_runs(&self) -> Result<Vec<ObservingRun>, AppError>;

    async fn get_run(&self, run_id: i64) -> Result<ObservingRun, AppError>;

    async fn get_items(&self, container_id: i64) -> Result<Vec<ContainerItem>, AppError>;
}

/// Builds a [`Phase2Api`] for one set of credentials.
#[async_trait]
pub trait Phase2Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Phase2Api>, AppError>;
}

// ─── Choice Builders ─────────────────────────────────────────

/// `(runId, "progId - telescope - instrument")` for every run of the user.
pub async fn observing_run_choices(api: &dyn Phase2Api) -> Result<Vec<Choice>, AppError> {
    let runs = api.get_runs().await?;
    Ok(runs
        .iter()
        .map(|run| Choice::new(run.run_id, run.label()))
        .collect())
}

/// Folders directly inside the run's top-level container.
pub async fn folder_name_choices(
    api: &dyn Phase2Api,
    observing_run_id: i64,
) -> Result<Vec<Choice>, AppError> {
    let run = api.get_run(observing_run_id).await?;
    let items = api.get_items(run.container_id).await?;

    Ok(items
        .into_iter()
        .filter(|item| item.item_type == ContainerItem::FOLDER)
        .filter_map(|item| item.container_id.map(|id| Choice::new(id, item.name)))
        .collect())
}

/// Observation blocks inside a folder.
pub async fn folder_ob_choices(
    api: &dyn Phase2Api,
    folder_id: i64,
) -> Result<Vec<Choice>, AppError> {
    let items = api.get_items(folder_id).await?;

    Ok(items
        .into_iter()
        .filter(|item| item.item_type == ContainerItem::OBSERVATION_BLOCK)
        .filter_map(|item| item.ob_id.map(|id| Choice::new(id, item.name)))
        .collect())
}

// ─── HTTP Implementation ─────────────────────────────────────

/// Connects to the real ESO API over HTTPS.
#[derive(Clone)]
pub struct EsoApiConnector {
    http: reqwest::Client,
    base_url_override: Option<String>,
}

impl EsoApiConnector {
    pub fn new(timeout_secs: u64, base_url_override: Option<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            base_url_override,
        })
    }

    fn base_url(&self, environment: P2Environment) -> String {
        self.base_url_override
            .clone()
            .unwrap_or_else(|| environment.api_url().to_string())
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[async_trait]
impl Phase2Connector for EsoApiConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Phase2Api>, AppError> {
        let base_url = self.base_url(credentials.environment);

        let response = self
            .http
            .post(format!("{}/login", base_url))
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::EsoApi(format!("Login request failed: {}", e)))?;

        let login: LoginResponse = check_response_json(response).await?;

        tracing::debug!(
            environment = %credentials.environment,
            username = %credentials.username,
            "ESO API login successful"
        );

        Ok(Box::new(P2Client {
            http: self.http.clone(),
            base_url,
            access_token: login.access_token,
        }))
    }
}

/// Phase 2 client holding a bearer token for a single request.
struct P2Client {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl P2Client {
    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, AppError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::EsoApi(e.to_string()))?;

        check_response_json(response).await
    }
}

#[async_trait]
impl Phase2Api for P2Client {
    async fn get_runs(&self) -> Result<Vec<ObservingRun>, AppError> {
        self.get_json("/v1/obsRuns").await
    }

    async fn get_run(&self, run_id: i64) -> Result<ObservingRun, AppError> {
        self.get_json(&format!("/v1/obsRuns/{}", run_id)).await
    }

    async fn get_items(&self, container_id: i64) -> Result<Vec<ContainerItem>, AppError> {
        self.get_json(&format!("/v1/containers/{}/items", container_id))
            .await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            tracing::warn!(status = status.as_u16(), "ESO API rejected credentials");
            return Err(AppError::EsoApi(AppError::ESO_AUTH_FAILED.to_string()));
        }

        return Err(AppError::EsoApi(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::EsoApi(format!("JSON parse error: {}", e)))
}
