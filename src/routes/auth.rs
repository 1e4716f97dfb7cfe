// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform account routes: register, login, logout, password change.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{delete, post},
    Extension, Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::services::crypto::SessionKey;
use crate::AppState;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Routes that need a session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/password", post(change_password))
        .route("/auth/account", delete(delete_account))
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct PasswordChangeForm {
    current_password: String,
    new_password: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub username: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    let user = state.accounts.register(&form.username, &form.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            username: user.username,
        }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, Redirect)> {
    let (user, key) = state
        .accounts
        .authenticate(&form.username, &form.password)
        .await?;

    let jar = start_session(&state, jar, &user.username, key, &user.key_salt)?;
    tracing::info!(username = %user.username, "User logged in");

    Ok((jar, Redirect::to("/eso/profile/")))
}

/// Logout works with or without a valid session.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(claims) =
            crate::middleware::auth::verify_jwt(cookie.value(), &state.config.jwt_signing_key)
        {
            state.sessions.revoke(&claims.sid);
            tracing::info!(username = %claims.sub, "User logged out");
        }
    }

    (jar.remove(Cookie::build(SESSION_COOKIE).path("/")), Redirect::to("/"))
}

/// Change the platform password.
///
/// The ESO profile is re-encrypted under the new key before anything is
/// written. Every session of the user is revoked and a new one is issued for
/// the caller.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Form(form): Form<PasswordChangeForm>,
) -> Result<(CookieJar, Redirect)> {
    let (account, new_key) = state
        .accounts
        .change_password(
            &user.username,
            &form.current_password,
            &form.new_password,
            &user.session_key,
            &user.key_salt,
        )
        .await?;

    let revoked = state.sessions.revoke_user(&user.username);
    tracing::info!(
        username = %user.username,
        revoked,
        "Password changed, sessions revoked"
    );

    let jar = start_session(&state, jar, &account.username, new_key, &account.key_salt)?;
    Ok((jar, Redirect::to("/eso/profile/")))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    tracing::info!(username = %user.username, "User-initiated account deletion");

    state.accounts.delete(&user.username).await?;
    state.sessions.revoke_user(&user.username);

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    ))
}

/// Store the key in a new session and set the session cookie.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    username: &str,
    key: SessionKey,
    key_salt: &str,
) -> Result<CookieJar> {
    let session_id = state.sessions.create(username, key, key_salt)?;
    let jwt = create_jwt(
        username,
        &session_id,
        state.config.session_ttl_hours,
        &state.config.jwt_signing_key,
    )
    .map_err(AppError::Internal)?;

    let cookie = Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies)
        .same_site(SameSite::Lax);

    Ok(jar.add(cookie))
}
