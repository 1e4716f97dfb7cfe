// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO facility server
//!
//! Serves the ESO profile pages and the htmx observation form backed by the
//! ESO Phase 2 API.

use eso_facility::{config::Config, db::FirestoreDb, services::EsoApiConnector, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting ESO facility");

    let db = match config.gcp_project_id.as_deref() {
        Some(project_id) => FirestoreDb::new(project_id).await?,
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory store");
            FirestoreDb::new_in_memory()
        }
    };

    let eso = EsoApiConnector::new(config.eso_api_timeout_secs, config.eso_api_url.clone())?;
    tracing::info!(
        timeout_secs = config.eso_api_timeout_secs,
        base_url_override = ?config.eso_api_url,
        "ESO API connector initialized"
    );

    let state = Arc::new(AppState::new(config.clone(), db, Arc::new(eso)));

    // Session keys only live in memory; drop the expired ones periodically.
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::info!(purged, remaining = sessions.len(), "Purged expired sessions");
            }
        }
    });

    // Build router
    let app = eso_facility::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("eso_facility=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
