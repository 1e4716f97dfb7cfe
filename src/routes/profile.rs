// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO profile pages shown inside the user's platform profile.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};
use std::sync::Arc;

use crate::error::Result;
use crate::forms::profile::{render_profile_card, render_profile_edit_form, ProfileForm};
use crate::middleware::auth::AuthUser;
use crate::services::profile::ProfileUpdate;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/eso/profile/", get(profile_card))
        .route("/eso/profile/edit/", get(edit_form).post(save_profile))
}

/// Profile card with the decrypted ESO password.
async fn profile_card(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Html<String>> {
    let profile = state.profiles.get_or_create(&user.username).await?;
    let password = state
        .profiles
        .decrypted_password(&profile, &user.session_key)?;

    Ok(Html(render_profile_card(&profile, password.as_deref())))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Html<String>> {
    let profile = state.profiles.get_or_create(&user.username).await?;
    Ok(Html(render_profile_edit_form(&profile, &[])))
}

async fn save_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let p2_environment = match form.clean() {
        Ok(env) => env,
        Err(errors) => {
            tracing::info!(username = %user.username, ?errors, "Invalid ESO profile form");
            let mut shown = state.profiles.get_or_create(&user.username).await?;
            shown.p2_username = form.p2_username;
            return Ok((
                StatusCode::BAD_REQUEST,
                Html(render_profile_edit_form(&shown, &errors)),
            )
                .into_response());
        }
    };

    let p2_password = Some(form.p2_password).filter(|p| !p.is_empty());
    state
        .profiles
        .update(
            &user.username,
            ProfileUpdate {
                p2_environment,
                p2_username: form.p2_username,
                p2_password,
            },
            &user.session_key,
            &user.key_salt,
        )
        .await?;

    Ok(Redirect::to("/eso/profile/").into_response())
}
