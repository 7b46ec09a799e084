// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON response helpers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt::Display;

const ENCODE_FAILED: &str = r#"{"error": "failed to encode response"}"#;

fn json(status: StatusCode, body: impl Into<axum::body::Body>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body.into()).into_response()
}

/// 200 `{"status":"ok"}`
pub fn ok() -> Response {
    json(StatusCode::OK, r#"{"status":"ok"}"#)
}

/// 404 `{"not":"found"}`
pub fn not_found() -> Response {
    json(StatusCode::NOT_FOUND, r#"{"not":"found"}"#)
}

/// 200 with `value` encoded as JSON.
///
/// Falls back to a fixed 500 body when `value` cannot be encoded.
pub fn objects<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => json(StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            json(StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILED)
        }
    }
}

/// `status` with `{"error":"<err>"}`.
pub fn not_ok(status: StatusCode, err: impl Display) -> Response {
    let message = err.to_string();
    tracing::error!(status = status.as_u16(), error = %message, "request failed");

    match serde_json::to_vec(&serde_json::json!({ "error": message })) {
        Ok(body) => json(status, body),
        Err(_) => json(StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILED),
    }
}
