//! The outbound response and its frame serialization.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, DATE, LOCATION};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::protocol::{ResponseFrame, WireError, WireSender};

/// A fully materialized response: status, headers, body bytes.
///
/// Streaming bodies are a driver concern; the engine always produces a
/// single final body frame.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// 200 with a JSON body.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        let body = serde_json::to_vec(value).map_or_else(|_| Bytes::new(), Bytes::from);
        Self {
            status: StatusCode::OK,
            headers: content_type("application/json"),
            body,
        }
    }

    /// 200 with an HTML body.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: content_type("text/html; charset=utf-8"),
            body: Bytes::from(body.into()),
        }
    }

    /// 200 with a plain-text body.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: content_type("text/plain; charset=utf-8"),
            body: Bytes::from(body.into()),
        }
    }

    /// 200 with an opaque binary body.
    #[must_use]
    pub fn bytes(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: content_type("application/octet-stream"),
            body: body.into(),
        }
    }

    /// 307 to `location`.
    #[must_use]
    pub fn redirect(location: HeaderValue) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, location);
        Self { status: StatusCode::TEMPORARY_REDIRECT, headers, body: Bytes::new() }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Writes the response as a `Start` frame followed by one final body
    /// frame. Stamps `content-length` from the body and a `date` header
    /// when none is set. With `head_only` the headers (including
    /// `content-length`) still describe the body, but an empty frame is
    /// written, which is the HEAD semantics.
    ///
    /// # Errors
    /// Returns [`WireError::ChannelClosed`] when the driver stopped
    /// listening.
    pub async fn write<S>(&self, sender: &mut S, head_only: bool) -> Result<(), WireError>
    where
        S: WireSender + ?Sized,
    {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        if !headers.contains_key(DATE) {
            if let Ok(stamp) = HeaderValue::from_str(&http_date()) {
                headers.insert(DATE, stamp);
            }
        }

        sender.send(ResponseFrame::Start { status: self.status, headers }).await?;
        let data = if head_only { Bytes::new() } else { self.body.clone() };
        sender.send(ResponseFrame::Body { data, more: false }).await
    }
}

fn content_type(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
    headers
}

/// Current time in the RFC 7231 fixed-date format.
#[must_use]
pub fn http_date() -> String {
    chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn frames_of(response: &Response, head_only: bool) -> Vec<ResponseFrame> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ResponseFrame>(4);
        let mut sender = tx;
        if let Err(e) = response.write(&mut sender, head_only).await {
            panic!("write failed: {e}");
        }
        drop(sender);
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn constructors_set_the_expected_content_types() {
        let cases = [
            (Response::json(&serde_json::json!({"a": 1})), "application/json"),
            (Response::html("<p>hi</p>"), "text/html; charset=utf-8"),
            (Response::text("hi"), "text/plain; charset=utf-8"),
            (Response::bytes(&b"\x00\x01"[..]), "application/octet-stream"),
        ];
        for (response, expected) in cases {
            let got = response.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
            assert_eq!(got, Some(expected));
            assert_eq!(response.status, StatusCode::OK);
        }
    }

    #[test]
    fn redirect_is_temporary_with_location() {
        let response = Response::redirect(HeaderValue::from_static("/elsewhere"));
        assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers.get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/elsewhere")
        );
    }

    #[tokio::test]
    async fn write_emits_start_then_one_final_body_frame() {
        let response = Response::text("hello");
        let frames = frames_of(&response, false).await;
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            ResponseFrame::Start { status, headers } => {
                assert_eq!(*status, StatusCode::OK);
                assert_eq!(
                    headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
                    Some("5"),
                    "content-length must be stamped from the body"
                );
                assert!(headers.contains_key(DATE), "a date header must be stamped");
            }
            other => panic!("expected Start first, got {other:?}"),
        }
        match &frames[1] {
            ResponseFrame::Body { data, more } => {
                assert_eq!(data.as_ref(), b"hello");
                assert!(!more, "the engine writes a single final frame");
            }
            other => panic!("expected Body second, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn head_only_write_keeps_headers_but_drops_the_body() {
        let response = Response::text("hello");
        let frames = frames_of(&response, true).await;
        match &frames[0] {
            ResponseFrame::Start { headers, .. } => assert_eq!(
                headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
                Some("5"),
                "HEAD keeps the entity headers"
            ),
            other => panic!("expected Start first, got {other:?}"),
        }
        match &frames[1] {
            ResponseFrame::Body { data, .. } => {
                assert!(data.is_empty(), "HEAD must not carry a body");
            }
            other => panic!("expected Body second, got {other:?}"),
        }
    }

    #[test]
    fn http_date_has_the_fixed_rfc_shape() {
        let stamp = http_date();
        assert!(stamp.ends_with(" GMT"), "date must be GMT-suffixed, got {stamp}");
        assert_eq!(stamp.len(), 29, "fixed-length RFC 7231 date, got {stamp}");
    }
}
