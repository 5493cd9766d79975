//! Request-body logging with sensitive-key redaction.
//!
//! Credential endpoints receive passwords and tokens in their JSON bodies;
//! this layer logs those bodies for debugging with every sensitive key
//! replaced before the value reaches the log backend.

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::Response;
use huddle_core::redact::{clip, redact_json};

/// Bodies larger than this are not buffered for logging.
const MAX_LOGGED_BODY: u64 = 64 * 1024;

/// Logged body text is clipped to this many bytes.
const MAX_LOGGED_CHARS: usize = 2048;

/// Log JSON request bodies at debug level, redacted and clipped.
///
/// Non-JSON bodies and bodies without a small declared length pass through
/// untouched.
pub async fn log_request_body(request: Request, next: Next) -> Response {
    if !should_buffer(&request) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_LOGGED_BODY as usize).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(error = %err, "failed to buffer request body for logging");
            Bytes::new()
        }
    };

    tracing::debug!(
        method = %parts.method,
        path = %parts.uri.path(),
        body = %clip(&redact_json(&bytes), MAX_LOGGED_CHARS),
        "http request body"
    );

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

/// Buffer only JSON bodies that declare a small content length.
fn should_buffer(request: &Request) -> bool {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    if !is_json {
        return false;
    }
    request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len <= MAX_LOGGED_BODY)
}
