// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO observation form routes.
//!
//! Each endpoint returns one HTML field that htmx swaps into the form:
//! observing run → folder → observation block → P2 tool iframe.
//! Every request decrypts the caller's ESO login with their session key and
//! talks to the ESO API through a client that lives for that request only.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::facility::FacilityInfo;
use crate::forms::observation::{
    self, error_loading, not_configured, p2_tool_iframe, render_facility_context,
};
use crate::middleware::auth::AuthUser;
use crate::models::P2Environment;
use crate::services::eso_api::{folder_name_choices, folder_ob_choices, observing_run_choices};
use crate::services::{CredentialLookup, Phase2Api};
use crate::AppState;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/eso/facility/", get(facility_info))
}

/// Routes that need a session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/eso/observing-run/", get(observing_run))
        .route("/eso/observing-run-folders/", get(observing_run_folders))
        .route("/eso/folder-observation-blocks/", get(folder_observation_blocks))
        // Earlier URL of the same fragment
        .route("/eso/folders-items/", get(folder_observation_blocks))
        .route("/eso/show-observation-block/", get(show_observation_block))
        .route("/eso/observation-form/", get(observation_form))
}

#[derive(Debug, Default, Deserialize)]
pub struct DropdownQuery {
    p2_observing_run: Option<String>,
    p2_folder_name: Option<String>,
    observation_blocks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ObservationFormQuery {
    observation_type: Option<String>,
}

/// Positive integer id from a query parameter.
fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Like [`parse_id`], logging a warning when the parameter is unusable.
fn require_id(raw: Option<&str>, field: &str, user: &AuthUser) -> Option<i64> {
    let id = parse_id(raw);
    if id.is_none() {
        tracing::warn!(
            username = %user.username,
            field,
            value = raw.unwrap_or(""),
            "Missing or invalid id, returning default choices"
        );
    }
    id
}

enum Connection {
    NotConfigured,
    Connected(Box<dyn Phase2Api>),
    Failed,
}

/// Open an ESO API session with the caller's stored login.
///
/// A login that cannot be decrypted is an error, not a "not configured"
/// profile.
async fn connect(state: &AppState, user: &AuthUser, thing: &str) -> Result<Connection> {
    let credentials = match state
        .profiles
        .credentials(&user.username, &user.session_key)
        .await?
    {
        CredentialLookup::NotConfigured => {
            tracing::info!(username = %user.username, "ESO credentials not configured");
            return Ok(Connection::NotConfigured);
        }
        CredentialLookup::Ready(credentials) => credentials,
    };

    match state.eso.connect(&credentials).await {
        Ok(api) => Ok(Connection::Connected(api)),
        Err(e) => {
            log_remote_error(user, thing, &e);
            Ok(Connection::Failed)
        }
    }
}

fn log_remote_error(user: &AuthUser, thing: &str, error: &AppError) {
    if error.is_eso_auth_error() {
        tracing::warn!(username = %user.username, thing, "ESO rejected the stored credentials");
    } else {
        tracing::error!(username = %user.username, thing, error = %error, "Error loading from ESO");
    }
}

/// Run field, loaded when the form is first shown.
async fn observing_run(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DropdownQuery>,
) -> Result<Html<String>> {
    const THING: &str = "observing runs";

    let field = match connect(&state, &user, THING).await? {
        Connection::NotConfigured => observation::observing_run_field().with_choices(not_configured()),
        Connection::Failed => observation::observing_run_field().with_choices(error_loading(THING)),
        Connection::Connected(api) => match observing_run_choices(api.as_ref()).await {
            Ok(runs) => observation::observing_run_field_with(runs),
            Err(e) => {
                log_remote_error(&user, THING, &e);
                observation::observing_run_field().with_choices(error_loading(THING))
            }
        },
    };

    let field = match parse_id(query.p2_observing_run.as_deref()) {
        Some(run_id) => field.with_selected(run_id),
        None => field,
    };

    Ok(Html(field.render()))
}

/// Folder field for the selected observing run.
async fn observing_run_folders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DropdownQuery>,
) -> Result<Html<String>> {
    const THING: &str = "folders";

    let Some(run_id) = require_id(
        query.p2_observing_run.as_deref(),
        observation::OBSERVING_RUN_FIELD,
        &user,
    ) else {
        return Ok(Html(observation::folder_field().render()));
    };

    let choices = match connect(&state, &user, THING).await? {
        Connection::NotConfigured => not_configured(),
        Connection::Failed => error_loading(THING),
        Connection::Connected(api) => folder_name_choices(api.as_ref(), run_id)
            .await
            .unwrap_or_else(|e| {
                log_remote_error(&user, THING, &e);
                error_loading(THING)
            }),
    };

    tracing::debug!(username = %user.username, run_id, count = choices.len(), "Folder choices");
    Ok(Html(observation::folder_field().with_choices(choices).render()))
}

/// Observation-block field for the selected folder.
async fn folder_observation_blocks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DropdownQuery>,
) -> Result<Html<String>> {
    const THING: &str = "observation blocks";

    let Some(folder_id) = require_id(
        query.p2_folder_name.as_deref(),
        observation::FOLDER_FIELD,
        &user,
    ) else {
        return Ok(Html(observation::observation_blocks_field().render()));
    };

    let choices = match connect(&state, &user, THING).await? {
        Connection::NotConfigured => not_configured(),
        Connection::Failed => error_loading(THING),
        Connection::Connected(api) => folder_ob_choices(api.as_ref(), folder_id)
            .await
            .unwrap_or_else(|e| {
                log_remote_error(&user, THING, &e);
                error_loading(THING)
            }),
    };

    Ok(Html(
        observation::observation_blocks_field()
            .with_choices(choices)
            .render(),
    ))
}

/// P2 tool iframe for the selected observation block.
async fn show_observation_block(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DropdownQuery>,
) -> Result<Html<String>> {
    let Some(ob_id) = require_id(
        query.observation_blocks.as_deref(),
        observation::OBSERVATION_BLOCKS_FIELD,
        &user,
    ) else {
        return Ok(Html(p2_tool_iframe(None)));
    };

    let environment = state
        .db
        .get_profile(&user.username)
        .await?
        .map(|p| p.p2_environment)
        .unwrap_or(P2Environment::Demo);

    let url = state.facility.p2_tool_url(environment, ob_id);
    Ok(Html(p2_tool_iframe(Some(&url))))
}

/// Whole observation form for a type, with the facility header.
async fn observation_form(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ObservationFormQuery>,
) -> Result<Html<String>> {
    let observation_type = query
        .observation_type
        .as_deref()
        .unwrap_or(crate::facility::EsoFacility::DEFAULT_OBSERVATION_TYPE);
    let form = state.facility.get_form(observation_type);

    let p2_username = state
        .db
        .get_profile(&user.username)
        .await?
        .map(|p| p.p2_username)
        .filter(|name| !name.is_empty());
    let context = state.facility.context_data(p2_username);

    Ok(Html(format!(
        "{}{}",
        render_facility_context(&context),
        form.render()
    )))
}

async fn facility_info(State(state): State<Arc<AppState>>) -> Json<FacilityInfo> {
    Json(state.facility.info())
}
