// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-rendered form fields.
//!
//! Fields render as Bootstrap markup wrapped in `<div id="div_id_{name}">`,
//! so an htmx response can swap a single field in place.

pub mod observation;
pub mod profile;

use std::fmt::Write as _;

/// One `<option>` of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }

    /// Stand-in entry with value `0`, used for "please select" and error rows.
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self::new(0, label)
    }
}

/// htmx attributes attached to a `<select>`.
#[derive(Debug, Clone)]
pub struct HtmxGet {
    pub url: &'static str,
    pub trigger: &'static str,
    pub target: &'static str,
}

/// A `<select>` field with its label and choices.
#[derive(Debug, Clone)]
pub struct ChoiceField {
    pub name: &'static str,
    pub label: &'static str,
    pub choices: Vec<Choice>,
    pub selected: Option<String>,
    pub htmx: Option<HtmxGet>,
}

impl ChoiceField {
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_selected(mut self, value: impl ToString) -> Self {
        self.selected = Some(value.to_string());
        self
    }

    /// Render the wrapper div, label and select.
    pub fn render(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            r#"<div id="div_id_{name}" class="mb-3"><label for="id_{name}" class="form-label">{label}</label><div><select name="{name}" class="select form-select" id="id_{name}""#,
            name = self.name,
            label = escape_html(self.label),
        );

        if let Some(htmx) = &self.htmx {
            let _ = write!(
                html,
                r#" hx-get="{}" hx-trigger="{}" hx-target="{}" hx-swap="outerHTML""#,
                escape_html(htmx.url),
                escape_html(htmx.trigger),
                escape_html(htmx.target),
            );
        }
        html.push('>');

        for choice in &self.choices {
            let selected = if self.selected.as_deref() == Some(choice.value.as_str()) {
                " selected"
            } else {
                ""
            };
            let _ = write!(
                html,
                r#"<option value="{}"{}>{}</option>"#,
                escape_html(&choice.value),
                selected,
                escape_html(&choice.label),
            );
        }

        html.push_str("</select></div></div>");
        html
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
