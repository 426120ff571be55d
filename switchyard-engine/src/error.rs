//! Handler faults and the JSON error envelope.
//!
//! Every negative outcome of the pipeline is rendered as
//! `{"error": {"code", "message", "status"}}` so clients can branch on a
//! stable `code` instead of scraping messages.

use http::header::{HeaderValue, ALLOW};
use http::StatusCode;
use serde_json::json;

use switchyard_core::{MethodSet, ParamError};
use switchyard_wire::Response;

/// An application-level fault escaping a handler.
///
/// Handler faults terminate the current request with a generic 500; the
/// original error is kept for logging and is leaked to the client only in
/// debug mode.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// A fault described only by a message.
    #[error("{0}")]
    Message(String),

    /// The wire went away while the handler was reading the request.
    #[error(transparent)]
    Wire(#[from] switchyard_wire::WireError),

    /// Any other application error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

/// Builds one enveloped error response.
#[must_use]
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    Response::json(&json!({
        "error": {
            "code": code,
            "message": message,
            "status": status.as_u16(),
        }
    }))
    .with_status(status)
}

/// 404 for a path no template matches.
#[must_use]
pub fn not_found(path: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", &format!("no route matches '{path}'"))
}

/// 405 carrying the union of allowed methods in an `allow` header.
#[must_use]
pub fn method_not_allowed(allowed: &MethodSet) -> Response {
    let response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        &format!("allowed methods: {allowed}"),
    );
    match HeaderValue::from_str(&allowed.to_string()) {
        Ok(value) => response.with_header(ALLOW, value),
        Err(_) => response,
    }
}

/// 400 for a path parameter its converter rejected.
#[must_use]
pub fn invalid_param(error: &ParamError) -> Response {
    error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", &error.to_string())
}

/// 429 for a throttled client.
#[must_use]
pub fn rate_limited() -> Response {
    error_response(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT", "rate limit exceeded")
}

/// Generic 500. `detail` replaces the stock message only in debug mode.
#[must_use]
pub fn server_error(debug: bool, detail: &str) -> Response {
    let message = if debug { detail } else { "internal server error" };
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", message)
}

/// 503 for a pipeline that exhausted its time budget.
#[must_use]
pub fn timed_out() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "SERVER_ERROR", "request timed out")
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::Value;

    use super::*;

    fn envelope_of(response: &Response) -> Value {
        match serde_json::from_slice(&response.body) {
            Ok(value) => value,
            Err(e) => panic!("error body must be JSON: {e}"),
        }
    }

    #[test]
    fn envelope_carries_code_message_and_status() {
        let response = not_found("/missing");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let body = envelope_of(&response);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["status"], 404);
        let message = body["error"]["message"].as_str().unwrap_or_default();
        assert!(message.contains("/missing"), "message must name the path, got {message}");
    }

    #[test]
    fn method_not_allowed_sets_the_allow_header() {
        let allowed = MethodSet::new([Method::POST, Method::GET, Method::HEAD]);
        let response = method_not_allowed(&allowed);
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers.get(ALLOW).and_then(|v| v.to_str().ok()),
            Some("GET, HEAD, POST"),
            "allow header must list the canonical union"
        );
    }

    #[test]
    fn server_error_hides_detail_unless_debug() {
        let hidden = server_error(false, "db password wrong");
        let body = envelope_of(&hidden);
        assert_eq!(body["error"]["message"], "internal server error");

        let shown = server_error(true, "db password wrong");
        let body = envelope_of(&shown);
        assert_eq!(body["error"]["message"], "db password wrong");
    }

    #[test]
    fn handler_error_converts_from_strings_and_wire_errors() {
        let from_str: HandlerError = "boom".into();
        assert_eq!(from_str.to_string(), "boom");

        let from_wire: HandlerError = switchyard_wire::WireError::ChannelClosed.into();
        assert!(matches!(from_wire, HandlerError::Wire(_)));
    }
}
