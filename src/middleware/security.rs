// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Security headers middleware.
//!
//! Pages may be framed by the hosting platform (same origin) and may embed
//! the ESO P2 tool, so the policy is looser than a pure JSON API's.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' https://unpkg.com; \
style-src 'self' 'unsafe-inline'; frame-src https://www.eso.org; frame-ancestors 'self'";

/// Add security headers to all responses.
pub async fn add_security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(CONTENT_SECURITY_POLICY),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("same-origin"),
    );
    // Fragments carry decrypted credentials.
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));

    response
}
