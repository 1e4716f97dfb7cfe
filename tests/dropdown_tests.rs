// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Observation form dropdown endpoint tests.

use axum::http::StatusCode;

mod common;
use common::{option_count, StubConnector};

const PASSWORD: &str = "hunter2hunter2";

/// Signed-in user whose profile points at the demo account 520520.
async fn configured_app(connector: StubConnector) -> (axum::Router, String) {
    let (app, _) = common::create_test_app_with(connector);
    let cookie = common::signed_in(&app, "alice", PASSWORD).await;
    let response = common::save_profile(&app, &cookie, "demo", "520520", "p2-secret").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    (app, cookie)
}

#[tokio::test]
async fn test_observing_runs_listed_after_placeholder() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (status, html) = common::get(&app, "/eso/observing-run/", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"id="div_id_p2_observing_run""#));
    assert_eq!(option_count(&html), 2);
    assert!(html.contains(r#"<option value="0">Please select an Observing Run</option>"#));
    assert!(html.contains(r#"<option value="60925315">60.A-9252(M) - UT2 - XSHOOTER</option>"#));
    assert!(html.contains(r##"hx-target="#div_id_p2_folder_name""##));
}

#[tokio::test]
async fn test_observing_run_marks_selected() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (_, html) = common::get(&app, "/eso/observing-run/?p2_observing_run=60925315", &cookie).await;
    assert!(html.contains(r#"<option value="60925315" selected>"#));
}

#[tokio::test]
async fn test_folders_for_run() {
    let connector = StubConnector::with_demo_data();
    let (app, cookie) = configured_app(connector.clone()).await;

    let (status, html) = common::get(
        &app,
        "/eso/observing-run-folders/?p2_observing_run=60925315",
        &cookie,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"id="div_id_p2_folder_name""#));
    assert_eq!(option_count(&html), 2);
    assert!(html.contains(r#"<option value="1">FolderA</option>"#));
    assert!(html.contains(r#"<option value="2">FolderB</option>"#));
    assert!(!html.contains("Loose OB"));

    // The decrypted login reached the API client.
    let seen = connector.seen();
    let last = seen.last().unwrap();
    assert_eq!(last.username, "520520");
    assert_eq!(last.password, "p2-secret");
}

#[tokio::test]
async fn test_observation_blocks_for_folder() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (status, html) =
        common::get(&app, "/eso/folder-observation-blocks/?p2_folder_name=1", &cookie).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"id="div_id_observation_blocks""#));
    assert_eq!(option_count(&html), 2);
    assert!(html.contains(r#"<option value="101">Target 1</option>"#));
    assert!(html.contains(r#"<option value="102">Target 2</option>"#));
    assert!(html.contains(r##"hx-target="#id_eso_p2_tool_iframe""##));
}

#[tokio::test]
async fn test_folders_items_alias() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (_, canonical) =
        common::get(&app, "/eso/folder-observation-blocks/?p2_folder_name=1", &cookie).await;
    let (status, alias) = common::get(&app, "/eso/folders-items/?p2_folder_name=1", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alias, canonical);
}

#[tokio::test]
async fn test_invalid_ids_return_default_field() {
    let connector = StubConnector::with_demo_data();
    let (app, cookie) = configured_app(connector.clone()).await;

    for query in ["?p2_observing_run=abc", "?p2_observing_run=", "?p2_observing_run=0", ""] {
        let uri = format!("/eso/observing-run-folders/{query}");
        let (status, html) = common::get(&app, &uri, &cookie).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(option_count(&html), 1, "{uri}");
        assert!(html.contains("Please select an Observing Run first"), "{uri}");
    }

    for query in ["?p2_folder_name=abc", "?p2_folder_name=", ""] {
        let uri = format!("/eso/folder-observation-blocks/{query}");
        let (status, html) = common::get(&app, &uri, &cookie).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(option_count(&html), 1, "{uri}");
        assert!(html.contains("Please select a Folder first"), "{uri}");
    }

    // No ESO connection was opened.
    assert!(connector.seen().is_empty());
}

#[tokio::test]
async fn test_no_profile_gives_single_not_configured_choice() {
    let (app, _) = common::create_test_app();
    let cookie = common::signed_in(&app, "bob", PASSWORD).await;

    for uri in [
        "/eso/observing-run/",
        "/eso/observing-run-folders/?p2_observing_run=60925315",
        "/eso/folder-observation-blocks/?p2_folder_name=1",
    ] {
        let (status, html) = common::get(&app, uri, &cookie).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(option_count(&html), 1, "{uri}");
        assert!(
            html.contains(r#"<option value="0">ESO credentials not configured</option>"#),
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_profile_without_password_is_not_configured() {
    let connector = StubConnector::with_demo_data();
    let (app, _) = common::create_test_app_with(connector.clone());
    let cookie = common::signed_in(&app, "carol", PASSWORD).await;
    common::save_profile(&app, &cookie, "demo", "520520", "").await;

    let (_, html) = common::get(
        &app,
        "/eso/observing-run-folders/?p2_observing_run=60925315",
        &cookie,
    )
    .await;
    assert_eq!(option_count(&html), 1);
    assert!(html.contains("ESO credentials not configured"));
    assert!(connector.seen().is_empty());
}

#[tokio::test]
async fn test_remote_failure_shows_error_choice() {
    let (app, cookie) = configured_app(StubConnector::failing()).await;

    let (status, html) = common::get(
        &app,
        "/eso/observing-run-folders/?p2_observing_run=60925315",
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(option_count(&html), 1);
    assert!(html.contains(r#"<option value="0">Error loading folders</option>"#));

    let (_, html) = common::get(&app, "/eso/observing-run/", &cookie).await;
    assert!(html.contains("Error loading observing runs"));
}

#[tokio::test]
async fn test_unknown_run_shows_error_choice() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (status, html) = common::get(
        &app,
        "/eso/observing-run-folders/?p2_observing_run=12345",
        &cookie,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Error loading folders"));
}

#[tokio::test]
async fn test_show_observation_block_iframe() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (status, html) =
        common::get(&app, "/eso/show-observation-block/?observation_blocks=101", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"id="id_eso_p2_tool_iframe""#));
    assert!(html.contains(r#"src="https://www.eso.org/p2demo/home/ob/101""#));

    let (status, html) =
        common::get(&app, "/eso/show-observation-block/?observation_blocks=abc", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"src="about:blank""#));
}

#[tokio::test]
async fn test_iframe_follows_profile_environment() {
    let (app, _) = common::create_test_app();
    let cookie = common::signed_in(&app, "dave", PASSWORD).await;
    common::save_profile(&app, &cookie, "production_lasilla", "520520", "pw").await;

    let (_, html) =
        common::get(&app, "/eso/show-observation-block/?observation_blocks=7", &cookie).await;
    assert!(html.contains(r#"src="https://www.eso.org/p2ls/home/ob/7""#));
}

#[tokio::test]
async fn test_observation_form_skeleton() {
    let (app, cookie) = configured_app(StubConnector::with_demo_data()).await;

    let (status, html) =
        common::get(&app, "/eso/observation-form/?observation_type=xshooter", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"data-observation-type="XSHOOTER""#));
    assert!(html.contains("P2 account: 520520"));
    assert!(html.contains(r#"hx-get="/eso/observing-run/""#));

    let (_, html) = common::get(&app, "/eso/observation-form/?observation_type=SPHERE", &cookie).await;
    assert!(html.contains(r#"data-observation-type="OB""#));
}

#[tokio::test]
async fn test_facility_info() {
    let (app, _) = common::create_test_app();
    let response = common::send(
        &app,
        axum::http::Request::builder()
            .uri("/eso/facility/")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value =
        serde_json::from_str(&common::body_string(response).await).unwrap();
    assert_eq!(json["name"], "ESO");
    assert_eq!(json["sites"][0]["name"], "PARANAL");
    assert_eq!(json["sites"][1]["sitecode"], "lasilla");
    assert_eq!(json["observation_types"][0], "XSHOOTER");
}
