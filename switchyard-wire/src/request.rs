//! The per-request context handed to middleware and handlers.
//!
//! Wraps one connection's head and body stream behind lazy, cached
//! accessors: the body is drained from the wire exactly once, JSON and
//! form decoding happen on first use, and cookies and query pairs are
//! parsed on demand. The context is owned by exactly one in-flight
//! request task, so none of this needs synchronization.

use std::collections::HashMap;
use std::fmt;

use bytes::{Bytes, BytesMut};
use http::{Extensions, Method};
use serde_json::Value;
use url::form_urlencoded;

use switchyard_core::{ParamValue, PathParams};

use crate::protocol::{ConnectionHead, WireError, WireReceiver};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Ordered key/value pairs decoded from a query string or form body.
///
/// Lookup follows the first-value-wins convention for repeated keys;
/// [`Pairs::all`] is the explicit escape hatch for every value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pairs(Vec<(String, String)>);

impl Pairs {
    /// Decodes `application/x-www-form-urlencoded` input.
    #[must_use]
    pub fn decode(input: &str) -> Self {
        Self(form_urlencoded::parse(input.as_bytes()).into_owned().collect())
    }

    /// First value registered under `key`, if any.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value registered under `key`, in order.
    #[must_use]
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.0.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decodes a request body as JSON, leniently.
///
/// Fast path: parse the raw bytes. On failure, re-decode as lossy UTF-8,
/// trim, and retry. An empty or undecodable body yields `{}` so handlers
/// can treat "no JSON" and "empty JSON" uniformly.
#[must_use]
pub fn lenient_json(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    if let Ok(value) = serde_json::from_slice(body) {
        return value;
    }
    let text = String::from_utf8_lossy(body);
    serde_json::from_str(text.trim()).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

/// One request as seen by middleware and handlers.
pub struct RequestContext {
    head: ConnectionHead,
    params: PathParams,
    receiver: Box<dyn WireReceiver>,
    body: Option<Bytes>,
    json: Option<Value>,
    form: Option<Pairs>,
    query: Option<Pairs>,
    cookies: Option<HashMap<String, String>>,
    extensions: Extensions,
}

impl RequestContext {
    #[must_use]
    pub fn new(head: ConnectionHead, receiver: impl WireReceiver + 'static) -> Self {
        Self {
            head,
            params: PathParams::new(),
            receiver: Box::new(receiver),
            body: None,
            json: None,
            form: None,
            query: None,
            cookies: None,
            extensions: Extensions::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.head.path
    }

    #[must_use]
    pub fn head(&self) -> &ConnectionHead {
        &self.head
    }

    /// Converted path parameters. Empty until routing succeeds.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// One converted path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Installs the converted parameters of the matched route.
    pub fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    /// Case-insensitive header lookup; non-UTF-8 values read as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the declared content type is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header("content-type").is_some_and(|ct| ct.contains("application/json"))
    }

    /// Whether the declared content type is an URL-encoded form.
    #[must_use]
    pub fn is_form(&self) -> bool {
        self.header("content-type").is_some_and(|ct| ct.contains(FORM_CONTENT_TYPE))
    }

    /// Client address for logging and throttling: the first
    /// `x-forwarded-for` entry when present, otherwise the
    /// transport-reported peer.
    #[must_use]
    pub fn client_ip(&self) -> Option<String> {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Some(first.to_owned());
                }
            }
        }
        self.head.client.map(|addr| addr.ip().to_string())
    }

    /// Decoded query pairs, parsed on first use.
    pub fn query(&mut self) -> &Pairs {
        let pairs = match self.query.take() {
            Some(pairs) => pairs,
            None => Pairs::decode(&self.head.query),
        };
        self.query.insert(pairs)
    }

    /// First value of a query key.
    pub fn query_value(&mut self, key: &str) -> Option<&str> {
        self.query().first(key)
    }

    /// Every value of a repeated query key.
    pub fn query_all(&mut self, key: &str) -> Vec<&str> {
        self.query().all(key)
    }

    /// Cookie pairs from the `cookie` header, parsed on first use.
    /// A key sent twice keeps the later value.
    pub fn cookies(&mut self) -> &HashMap<String, String> {
        let map = match self.cookies.take() {
            Some(map) => map,
            None => parse_cookies(self.header("cookie").unwrap_or_default()),
        };
        self.cookies.insert(map)
    }

    /// One cookie by name.
    pub fn cookie(&mut self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }

    /// The whole request body.
    ///
    /// The first call drains body frames from the wire until a frame with
    /// `more == false` arrives and caches the bytes; every later call
    /// returns the cache without touching the wire again.
    ///
    /// # Errors
    /// Returns [`WireError::ChannelClosed`] when the driver disappears
    /// mid-body.
    pub async fn body(&mut self) -> Result<&Bytes, WireError> {
        let bytes = match self.body.take() {
            Some(bytes) => bytes,
            None => {
                let mut buf = BytesMut::new();
                loop {
                    let frame = self.receiver.next_frame().await?;
                    buf.extend_from_slice(&frame.data);
                    if !frame.more {
                        break;
                    }
                }
                buf.freeze()
            }
        };
        Ok(self.body.insert(bytes))
    }

    /// The body as lossy UTF-8 text.
    ///
    /// # Errors
    /// Propagates body-read failures.
    pub async fn text(&mut self) -> Result<String, WireError> {
        let body = self.body().await?;
        Ok(String::from_utf8_lossy(body).into_owned())
    }

    /// The body decoded as JSON via [`lenient_json`], cached after the
    /// first call.
    ///
    /// # Errors
    /// Propagates body-read failures; decode problems never error, they
    /// fall back to `{}`.
    pub async fn json(&mut self) -> Result<&Value, WireError> {
        let value = match self.json.take() {
            Some(value) => value,
            None => {
                let body = self.body().await?.clone();
                lenient_json(&body)
            }
        };
        Ok(self.json.insert(value))
    }

    /// Form pairs, decoded only when the declared content type is
    /// `application/x-www-form-urlencoded`; anything else yields an empty
    /// set. Cached after the first call.
    ///
    /// # Errors
    /// Propagates body-read failures.
    pub async fn form(&mut self) -> Result<&Pairs, WireError> {
        let pairs = match self.form.take() {
            Some(pairs) => pairs,
            None => {
                if self.is_form() {
                    let body = self.body().await?.clone();
                    let text = String::from_utf8_lossy(&body).into_owned();
                    Pairs::decode(&text)
                } else {
                    Pairs::default()
                }
            }
        };
        Ok(self.form.insert(pairs))
    }

    /// Typed per-request state shared between middleware and handlers.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.head.method)
            .field("path", &self.head.path)
            .field("params", &self.params)
            .field("body_cached", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_cookies(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for piece in raw.split(';') {
        if let Some((key, value)) = piece.trim().split_once('=') {
            if !key.is_empty() {
                map.insert(key.to_owned(), value.to_owned());
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};

    use crate::protocol::BodyFrame;

    use super::*;

    /// Frame source that counts how often the wire is polled.
    struct CountingReceiver {
        frames: Vec<BodyFrame>,
        polls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WireReceiver for CountingReceiver {
        async fn next_frame(&mut self) -> Result<BodyFrame, WireError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.frames.is_empty() {
                return Err(WireError::ChannelClosed);
            }
            Ok(self.frames.remove(0))
        }
    }

    fn ctx_with_frames(head: ConnectionHead, frames: Vec<BodyFrame>) -> (RequestContext, Arc<AtomicUsize>) {
        let polls = Arc::new(AtomicUsize::new(0));
        let receiver = CountingReceiver { frames, polls: Arc::clone(&polls) };
        (RequestContext::new(head, receiver), polls)
    }

    fn get(path: &str) -> ConnectionHead {
        ConnectionHead::new(Method::GET, path)
    }

    #[tokio::test]
    async fn body_concatenates_frames_until_more_is_false() {
        let (mut ctx, _) = ctx_with_frames(
            get("/x"),
            vec![BodyFrame::partial(&b"hello "[..]), BodyFrame::last(&b"world"[..])],
        );
        match ctx.body().await {
            Ok(body) => assert_eq!(body.as_ref(), b"hello world"),
            Err(e) => panic!("body read failed: {e}"),
        }
    }

    #[tokio::test]
    async fn body_is_read_once_and_cached() {
        let (mut ctx, polls) = ctx_with_frames(
            get("/x"),
            vec![BodyFrame::partial(&b"ab"[..]), BodyFrame::last(&b"cd"[..])],
        );
        let first = match ctx.body().await {
            Ok(body) => body.clone(),
            Err(e) => panic!("first read failed: {e}"),
        };
        let second = match ctx.body().await {
            Ok(body) => body.clone(),
            Err(e) => panic!("second read failed: {e}"),
        };
        assert_eq!(first, second);
        assert_eq!(polls.load(Ordering::SeqCst), 2, "wire must be drained exactly once");
    }

    #[tokio::test]
    async fn json_of_empty_body_is_empty_object() {
        let (mut ctx, _) = ctx_with_frames(get("/x"), vec![BodyFrame::end()]);
        match ctx.json().await {
            Ok(value) => assert_eq!(value, &serde_json::json!({})),
            Err(e) => panic!("json failed: {e}"),
        }
    }

    #[tokio::test]
    async fn json_of_garbage_falls_back_to_empty_object() {
        let (mut ctx, _) = ctx_with_frames(get("/x"), vec![BodyFrame::last(&b"{nope"[..])]);
        match ctx.json().await {
            Ok(value) => assert_eq!(value, &serde_json::json!({})),
            Err(e) => panic!("json failed: {e}"),
        }
    }

    #[tokio::test]
    async fn json_parses_objects_and_caches() {
        let (mut ctx, polls) = ctx_with_frames(
            get("/x"),
            vec![BodyFrame::last(&br#"{"name":"ada"}"#[..])],
        );
        for _ in 0..2 {
            match ctx.json().await {
                Ok(value) => assert_eq!(value["name"], "ada"),
                Err(e) => panic!("json failed: {e}"),
            }
        }
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn form_requires_the_urlencoded_content_type() {
        let head = get("/x").with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let (mut ctx, _) = ctx_with_frames(head, vec![BodyFrame::last(&b"a=1&b=2&a=3"[..])]);
        match ctx.form().await {
            Ok(pairs) => {
                assert_eq!(pairs.first("a"), Some("1"), "first value must win");
                assert_eq!(pairs.all("a"), vec!["1", "3"]);
                assert_eq!(pairs.first("b"), Some("2"));
            }
            Err(e) => panic!("form failed: {e}"),
        }

        let (mut ctx, _) = ctx_with_frames(get("/x"), vec![BodyFrame::last(&b"a=1"[..])]);
        match ctx.form().await {
            Ok(pairs) => assert!(pairs.is_empty(), "no content type means no form"),
            Err(e) => panic!("form failed: {e}"),
        }
    }

    #[test]
    fn query_first_value_wins_and_all_sees_everything() {
        let head = get("/search").with_query("q=rust&q=routing&page=2");
        let (mut ctx, _) = ctx_with_frames(head, vec![]);
        assert_eq!(ctx.query_value("q"), Some("rust"));
        assert_eq!(ctx.query_all("q"), vec!["rust", "routing"]);
        assert_eq!(ctx.query_value("page"), Some("2"));
        assert_eq!(ctx.query_value("missing"), None);
    }

    #[test]
    fn cookies_parse_and_later_duplicates_overwrite() {
        let head = get("/x").with_header(
            COOKIE,
            HeaderValue::from_static("session=abc; theme=dark; session=def"),
        );
        let (mut ctx, _) = ctx_with_frames(head, vec![]);
        assert_eq!(ctx.cookie("session"), Some("def"));
        assert_eq!(ctx.cookie("theme"), Some("dark"));
        assert_eq!(ctx.cookie("missing"), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let head = get("/x").with_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("42"),
        );
        let (ctx, _) = ctx_with_frames(head, vec![]);
        assert_eq!(ctx.header("X-Request-Id"), Some("42"));
        assert_eq!(ctx.header("x-request-id"), Some("42"));
    }

    #[test]
    fn client_ip_prefers_the_first_forwarded_entry() {
        let head = get("/x")
            .with_header(
                HeaderName::from_static("x-forwarded-for"),
                HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
            )
            .with_client("127.0.0.1:5000".parse().unwrap_or_else(|e| panic!("bad addr: {e}")));
        let (ctx, _) = ctx_with_frames(head, vec![]);
        assert_eq!(ctx.client_ip().as_deref(), Some("203.0.113.9"));

        let plain = get("/x")
            .with_client("127.0.0.1:5000".parse().unwrap_or_else(|e| panic!("bad addr: {e}")));
        let (ctx, _) = ctx_with_frames(plain, vec![]);
        assert_eq!(ctx.client_ip().as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn lost_driver_mid_body_surfaces_channel_closed() {
        let (mut ctx, _) = ctx_with_frames(get("/x"), vec![BodyFrame::partial(&b"never ends"[..])]);
        match ctx.body().await {
            Err(WireError::ChannelClosed) => {}
            other => panic!("expected ChannelClosed, got {other:?}"),
        }
    }

    #[test]
    fn lenient_json_accepts_padded_text() {
        let value = lenient_json(b"  {\"ok\": true}  ");
        assert_eq!(value["ok"], true);
    }
}
