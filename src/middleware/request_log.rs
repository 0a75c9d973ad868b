use std::error::Error as _;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, MatchedPath, RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::error::{ApiError, ErrorReport};
use crate::state::AppState;

/// Logs every routed request and, for error responses, the failure with its request context.
///
/// The body is buffered (up to `api.max_request_size_bytes`) so it can be logged and
/// then handed on to the handler unchanged. A larger body is refused with 413.
pub async fn log_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let (mut parts, body) = request.into_parts();

    let method = parts.method.clone();
    let route = parts
        .extensions
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let params = match RawPathParams::from_request_parts(&mut parts, &state).await {
        Ok(raw) => raw
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&"),
        Err(_) => String::new(),
    };
    let query = parts.uri.query().unwrap_or_default().to_string();

    let bytes = match to_bytes(body, state.config.api.max_request_size_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = if exceeds_limit(&e) {
                ApiError::payload_too_large(state.config.api.max_request_size_bytes)
            } else {
                ApiError::invalid_json(format!("Failed to read request body: {}", e))
            };
            tracing::error!(%method, %route, %params, %query, code = err.error_code(), "{}", err);
            return err.into_response();
        }
    };
    let logged_body = redact(&bytes);

    if state.config.api.enable_request_logging {
        tracing::info!(%method, %route, %params, %query, body = %logged_body, "Request received");
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
    let elapsed_ms = started.elapsed().as_millis();

    if let Some(report) = response.extensions().get::<ErrorReport>() {
        tracing::error!(
            %method,
            %route,
            %params,
            %query,
            body = %logged_body,
            code = report.code,
            status = response.status().as_u16(),
            "{}",
            report.message
        );
    }

    if state.config.api.enable_request_logging {
        tracing::info!(
            %method,
            %route,
            status = response.status().as_u16(),
            "Handled in {}ms",
            elapsed_ms
        );
    }

    response
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.is::<LengthLimitError>() {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Body text for the log, with any top-level `password` masked.
fn redact(bytes: &[u8]) -> String {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(mut fields)) => {
            if fields.contains_key("password") {
                fields.insert("password".to_string(), Value::String("***".to_string()));
            }
            Value::Object(fields).to_string()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}
