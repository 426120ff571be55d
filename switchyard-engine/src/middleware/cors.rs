//! Cross-origin resource sharing.

use async_trait::async_trait;
use http::header::HeaderValue;
use http::{Method, StatusCode};

use switchyard_wire::{RequestContext, Response};

use crate::middleware::{Middleware, Next};

/// CORS policy middleware.
///
/// Preflight `OPTIONS` requests (those carrying
/// `access-control-request-method`) are answered directly and never reach
/// the rest of the chain: 200 with the policy headers for an allowed
/// origin, 400 otherwise. Simple requests run the chain and get
/// `access-control-allow-origin` stamped on the way out.
pub struct CorsMiddleware {
    allow_origins: Vec<String>,
    allow_methods: Vec<Method>,
    allow_headers: Vec<String>,
    allow_credentials: bool,
    max_age: u32,
}

impl CorsMiddleware {
    /// The permissive stock policy: any origin, the five common methods,
    /// any header, no credentials, ten-minute preflight cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_origins: vec!["*".to_owned()],
            allow_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_headers: vec!["*".to_owned()],
            allow_credentials: false,
            max_age: 600,
        }
    }

    #[must_use]
    pub fn with_origins(mut self, origins: impl IntoIterator<Item = String>) -> Self {
        self.allow_origins = origins.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allow_methods = methods.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = String>) -> Self {
        self.allow_headers = headers.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allow_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// The `access-control-allow-origin` value for an allowed origin.
    /// Credentials forbid the wildcard, so the origin is echoed then.
    fn allow_origin_value(&self, origin: &str) -> HeaderValue {
        if !self.allow_credentials && self.allow_origins.iter().any(|o| o == "*") {
            return HeaderValue::from_static("*");
        }
        HeaderValue::from_str(origin).unwrap_or_else(|_| HeaderValue::from_static("*"))
    }

    fn preflight(&self, origin: &str) -> Response {
        if !self.origin_allowed(origin) {
            return Response::new(StatusCode::BAD_REQUEST);
        }

        let methods = self
            .allow_methods
            .iter()
            .map(http::Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let headers = self.allow_headers.join(", ");

        let mut response = Response::new(StatusCode::OK)
            .with_header(header("access-control-allow-origin"), self.allow_origin_value(origin));
        if let Ok(value) = HeaderValue::from_str(&methods) {
            response = response.with_header(header("access-control-allow-methods"), value);
        }
        if let Ok(value) = HeaderValue::from_str(&headers) {
            response = response.with_header(header("access-control-allow-headers"), value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.max_age.to_string()) {
            response = response.with_header(header("access-control-max-age"), value);
        }
        if self.allow_credentials {
            response = response.with_header(
                header("access-control-allow-credentials"),
                HeaderValue::from_static("true"),
            );
        }
        response
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

fn header(name: &'static str) -> http::header::HeaderName {
    http::header::HeaderName::from_static(name)
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let origin = ctx.header("origin").map(ToOwned::to_owned);

        let is_preflight = ctx.method() == Method::OPTIONS
            && ctx.header("access-control-request-method").is_some();
        if is_preflight {
            if let Some(origin) = origin.as_deref() {
                return self.preflight(origin);
            }
        }

        let mut response = next.run(ctx).await;
        if let Some(origin) = origin {
            if self.origin_allowed(&origin) {
                response = response.with_header(
                    header("access-control-allow-origin"),
                    self.allow_origin_value(&origin),
                );
                if self.allow_credentials {
                    response = response.with_header(
                        header("access-control-allow-credentials"),
                        HeaderValue::from_static("true"),
                    );
                }
            }
        }
        response
    }
}
