// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Observation form: observing run → folder → observation block → P2 tool.
//!
//! Each select fetches its child field when it changes; the last one swaps
//! the P2 tool iframe.

use super::{escape_html, Choice, ChoiceField, HtmxGet};
use crate::facility::FacilityContext;

pub const OBSERVING_RUN_FIELD: &str = "p2_observing_run";
pub const FOLDER_FIELD: &str = "p2_folder_name";
pub const OBSERVATION_BLOCKS_FIELD: &str = "observation_blocks";

pub const NOT_CONFIGURED: &str = "ESO credentials not configured";

pub fn observing_run_field() -> ChoiceField {
    ChoiceField {
        name: OBSERVING_RUN_FIELD,
        label: "Observing Run",
        choices: vec![Choice::placeholder("Please select an Observing Run")],
        selected: None,
        htmx: Some(HtmxGet {
            url: "/eso/observing-run-folders/",
            trigger: "change",
            target: "#div_id_p2_folder_name",
        }),
    }
}

/// Run field with the user's runs after the "please select" entry.
pub fn observing_run_field_with(runs: Vec<Choice>) -> ChoiceField {
    let mut field = observing_run_field();
    field.choices.extend(runs);
    field
}

pub fn folder_field() -> ChoiceField {
    ChoiceField {
        name: FOLDER_FIELD,
        label: "Folder Name",
        choices: vec![Choice::placeholder("Please select an Observing Run first")],
        selected: None,
        // `load` fetches the blocks of the folder that is selected on arrival.
        htmx: Some(HtmxGet {
            url: "/eso/folder-observation-blocks/",
            trigger: "load, change",
            target: "#div_id_observation_blocks",
        }),
    }
}

pub fn observation_blocks_field() -> ChoiceField {
    ChoiceField {
        name: OBSERVATION_BLOCKS_FIELD,
        label: "Observation Blocks",
        choices: vec![Choice::placeholder("Please select a Folder first")],
        selected: None,
        htmx: Some(HtmxGet {
            url: "/eso/show-observation-block/",
            trigger: "change",
            target: "#id_eso_p2_tool_iframe",
        }),
    }
}

/// Single "not configured" entry for users without ESO credentials.
pub fn not_configured() -> Vec<Choice> {
    vec![Choice::placeholder(NOT_CONFIGURED)]
}

/// Single "Error loading …" entry for a failed remote call.
pub fn error_loading(thing: &str) -> Vec<Choice> {
    vec![Choice::placeholder(format!("Error loading {}", thing))]
}

/// The P2 tool iframe, blank when no block is selected.
pub fn p2_tool_iframe(src: Option<&str>) -> String {
    format!(
        r#"<iframe id="id_eso_p2_tool_iframe" height="100%" width="100%" src="{}"></iframe>"#,
        escape_html(src.unwrap_or("about:blank"))
    )
}

/// Header line naming the facility, version and ESO account.
pub fn render_facility_context(ctx: &FacilityContext) -> String {
    let account = match ctx.p2_username.as_deref() {
        Some(name) if !name.is_empty() => escape_html(name),
        _ => "<em>not configured</em>".to_string(),
    };
    format!(
        r#"<p class="eso-facility-context text-muted">{} facility v{} &middot; P2 account: {}</p>"#,
        escape_html(ctx.name),
        escape_html(ctx.version),
        account
    )
}

/// Full form skeleton. The run field loads its choices through htmx.
pub fn render_observation_form(observation_type: &str) -> String {
    let run_field = format!(
        r#"<div hx-get="/eso/observing-run/" hx-trigger="load" hx-swap="outerHTML">{}</div>"#,
        observing_run_field().render()
    );

    format!(
        r#"<form id="eso-observation-form" data-observation-type="{ty}"><h5>ESO {ty}</h5>{run}{folder}{blocks}</form><div class="eso-p2-tool">{iframe}</div>"#,
        ty = escape_html(observation_type),
        run = run_field,
        folder = folder_field().render(),
        blocks = observation_blocks_field().render(),
        iframe = p2_tool_iframe(None),
    )
}
