//! Signed-cookie sessions.
//!
//! The whole session lives in the cookie: a base64url payload carrying
//! the data and an expiry claim, signed with HMAC-SHA256. The server
//! keeps no session store; tampering or expiry just yields a fresh empty
//! session.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use http::header::{HeaderValue, SET_COOKIE};
use serde_json::{Map, Value};
use sha2::Sha256;

use switchyard_wire::{RequestContext, Response};

use crate::middleware::{Middleware, Next};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_COOKIE_NAME: &str = "session";
const DEFAULT_MAX_AGE_SECS: i64 = 3600;

/// Mutable session state for one request.
///
/// Mutating accessors mark the session dirty; the middleware re-signs and
/// sets the cookie only for dirty sessions, so read-only requests never
/// emit `set-cookie`.
#[derive(Debug, Default)]
pub struct Session {
    values: Map<String, Value>,
    dirty: bool,
}

impl Session {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
        self.dirty = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.values.is_empty() {
            self.dirty = true;
        }
        self.values.clear();
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shared handle to the request's session, stored in the context
/// extensions. Handlers and middleware on concurrent await points go
/// through the mutex; poisoning is unrecoverable.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle(Arc<Mutex<Session>>);

impl SessionHandle {
    #[must_use]
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().expect("session lock poisoned")
    }
}

/// Installs a [`SessionHandle`] before the chain runs and re-signs the
/// cookie after, when the handler mutated the session.
pub struct SessionMiddleware {
    secret: String,
    cookie_name: String,
    max_age: i64,
}

impl SessionMiddleware {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: DEFAULT_COOKIE_NAME.to_owned(),
            max_age: DEFAULT_MAX_AGE_SECS,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    fn load(&self, token: Option<&str>) -> Session {
        let Some(token) = token else {
            return Session::default();
        };
        let Some(payload) = verify_token(&self.secret, token) else {
            return Session::default();
        };
        let Ok(parsed) = serde_json::from_str::<Value>(&payload) else {
            return Session::default();
        };
        let expired = parsed["exp"]
            .as_i64()
            .is_none_or(|exp| exp <= chrono::Utc::now().timestamp());
        if expired {
            return Session::default();
        }
        match parsed.get("data").and_then(Value::as_object) {
            Some(data) => Session { values: data.clone(), dirty: false },
            None => Session::default(),
        }
    }

    fn cookie_for(&self, session: &Session) -> Option<HeaderValue> {
        let exp = chrono::Utc::now().timestamp() + self.max_age;
        let payload = Value::Object(Map::from_iter([
            ("data".to_owned(), Value::Object(session.values.clone())),
            ("exp".to_owned(), Value::from(exp)),
        ]));
        let token = sign_token(&self.secret, &payload.to_string())?;
        HeaderValue::from_str(&format!(
            "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, self.max_age
        ))
        .ok()
    }
}

#[async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let token = ctx.cookie(&self.cookie_name).map(ToOwned::to_owned);
        let handle = SessionHandle(Arc::new(Mutex::new(self.load(token.as_deref()))));
        ctx.extensions_mut().insert(handle.clone());

        let mut response = next.run(ctx).await;

        let session = handle.lock();
        if session.is_dirty() {
            if let Some(cookie) = self.cookie_for(&session) {
                response.headers.append(SET_COOKIE, cookie);
            }
        }
        response
    }
}

/// Signs `payload` as `b64url(payload).b64url(hmac_sha256(secret, payload))`.
#[must_use]
pub fn sign_token(secret: &str, payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    let code = mac.finalize().into_bytes();
    Some(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(code)
    ))
}

/// Verifies a token and returns its payload, or `None` for any defect:
/// wrong shape, bad base64, bad signature, non-UTF-8 payload.
#[must_use]
pub fn verify_token(secret: &str, token: &str) -> Option<String> {
    let (payload_b64, sig_b64) = token.split_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let signature = URL_SAFE_NO_PAD.decode(sig_b64).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(&payload);
    mac.verify_slice(&signature).ok()?;

    String::from_utf8(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_under_the_same_secret() {
        let token = match sign_token("s3cret", r#"{"user":"ada"}"#) {
            Some(t) => t,
            None => panic!("signing must succeed"),
        };
        assert_eq!(verify_token("s3cret", &token).as_deref(), Some(r#"{"user":"ada"}"#));
    }

    #[test]
    fn tampered_and_foreign_tokens_are_rejected() {
        let token = match sign_token("s3cret", "payload") {
            Some(t) => t,
            None => panic!("signing must succeed"),
        };
        assert_eq!(verify_token("other-secret", &token), None, "wrong secret must fail");
        assert_eq!(verify_token("s3cret", &format!("x{token}")), None, "tampering must fail");
        assert_eq!(verify_token("s3cret", "no-dot-here"), None, "shape must be payload.sig");
    }

    #[test]
    fn mutation_marks_the_session_dirty() {
        let mut session = Session::default();
        assert!(!session.is_dirty());
        session.insert("user", Value::from("ada"));
        assert!(session.is_dirty());
        assert_eq!(session.get("user"), Some(&Value::from("ada")));
    }

    #[test]
    fn removing_a_missing_key_keeps_the_session_clean() {
        let mut session = Session::default();
        assert_eq!(session.remove("ghost"), None);
        assert!(!session.is_dirty(), "a no-op remove must not force a set-cookie");
    }

    #[test]
    fn expired_tokens_load_as_a_fresh_session() {
        let middleware = SessionMiddleware::new("s3cret");
        let stale = serde_json::json!({
            "data": {"user": "ada"},
            "exp": chrono::Utc::now().timestamp() - 10,
        });
        let token = match sign_token("s3cret", &stale.to_string()) {
            Some(t) => t,
            None => panic!("signing must succeed"),
        };
        let session = middleware.load(Some(&token));
        assert!(session.is_empty(), "an expired claim must not resurrect data");
    }

    #[test]
    fn valid_tokens_load_their_data() {
        let middleware = SessionMiddleware::new("s3cret");
        let fresh = serde_json::json!({
            "data": {"user": "ada"},
            "exp": chrono::Utc::now().timestamp() + 100,
        });
        let token = match sign_token("s3cret", &fresh.to_string()) {
            Some(t) => t,
            None => panic!("signing must succeed"),
        };
        let session = middleware.load(Some(&token));
        assert_eq!(session.get("user"), Some(&Value::from("ada")));
        assert!(!session.is_dirty(), "loading must not mark the session dirty");
    }
}
