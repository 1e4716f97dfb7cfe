// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO profile card and edit form.

use super::escape_html;
use crate::models::{EsoProfile, P2Environment};
use serde::Deserialize;
use std::fmt::Write as _;
use validator::Validate;

/// Submitted profile-edit form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    pub p2_environment: String,
    #[validate(length(max = 150, message = "must be at most 150 characters"))]
    pub p2_username: String,
    /// Blank keeps the stored password.
    #[serde(default)]
    #[validate(length(max = 256, message = "must be at most 256 characters"))]
    pub p2_password: String,
}

impl ProfileForm {
    /// Validate field lengths and parse the environment.
    pub fn clean(&self) -> Result<P2Environment, Vec<String>> {
        let mut errors = Vec::new();

        if let Err(validation) = self.validate() {
            for (field, field_errors) in validation.field_errors() {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    errors.push(format!("{}: {}", field, message));
                }
            }
        }

        match self.p2_environment.parse::<P2Environment>() {
            Ok(env) if errors.is_empty() => Ok(env),
            Ok(_) => Err(errors),
            Err(e) => {
                errors.push(format!("p2_environment: {}", e));
                Err(errors)
            }
        }
    }
}

/// Profile card shown on the user profile page.
pub fn render_profile_card(profile: &EsoProfile, password: Option<&str>) -> String {
    let password_html = match password {
        Some(p) => format!("<code>{}</code>", escape_html(p)),
        None => "<em>not set</em>".to_string(),
    };
    let username_html = if profile.p2_username.is_empty() {
        "<em>not set</em>".to_string()
    } else {
        escape_html(&profile.p2_username)
    };

    format!(
        r#"<div class="card" id="eso-profile-card"><div class="card-header">ESO Profile</div><div class="card-body"><dl class="row"><dt class="col-sm-4">P2 Environment</dt><dd class="col-sm-8" id="eso-p2-environment">{env}</dd><dt class="col-sm-4">P2 Username</dt><dd class="col-sm-8" id="eso-p2-username">{user}</dd><dt class="col-sm-4">P2 Password</dt><dd class="col-sm-8" id="eso-p2-password">{pass}</dd></dl><a class="btn btn-outline-primary" href="/eso/profile/edit/">Update</a></div></div>"#,
        env = escape_html(profile.p2_environment.label()),
        user = username_html,
        pass = password_html,
    )
}

/// Edit form; the password input is always rendered empty.
pub fn render_profile_edit_form(profile: &EsoProfile, errors: &[String]) -> String {
    let mut html = String::from(r#"<form method="post" action="/eso/profile/edit/" id="eso-profile-form">"#);

    if !errors.is_empty() {
        html.push_str(r#"<div class="alert alert-danger"><ul>"#);
        for err in errors {
            let _ = write!(html, "<li>{}</li>", escape_html(err));
        }
        html.push_str("</ul></div>");
    }

    html.push_str(r#"<div class="mb-3"><label for="id_p2_environment" class="form-label">P2 Environment</label><select name="p2_environment" id="id_p2_environment" class="form-select">"#);
    for env in P2Environment::ALL {
        let selected = if env == profile.p2_environment {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            html,
            r#"<option value="{}"{}>{}</option>"#,
            env.as_str(),
            selected,
            escape_html(env.label())
        );
    }
    html.push_str("</select></div>");

    let _ = write!(
        html,
        r#"<div class="mb-3"><label for="id_p2_username" class="form-label">P2 Username</label><input type="text" name="p2_username" id="id_p2_username" class="form-control" maxlength="150" value="{}"></div>"#,
        escape_html(&profile.p2_username)
    );
    html.push_str(r#"<div class="mb-3"><label for="id_p2_password" class="form-label">ESO Phase 2 Tool Password</label><input type="password" name="p2_password" id="id_p2_password" class="form-control" maxlength="256" value=""><div class="form-text">Enter your Phase 2 Tool password. Leave blank to keep the current one.</div></div>"#);
    html.push_str(r#"<button type="submit" class="btn btn-primary">Save</button></form>"#);
    html
}
