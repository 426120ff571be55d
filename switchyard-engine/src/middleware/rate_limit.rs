//! Per-client sliding-window rate limiting.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use switchyard_wire::{RequestContext, Response};

use crate::error;
use crate::middleware::{Middleware, Next};

const DEFAULT_MAX_REQUESTS: usize = 100;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Short-circuits clients that exceed `max_requests` within `window`.
///
/// Clients are keyed by the transport-reported peer IP, not by forwarded
/// headers, so a client cannot reset its own budget; the port is ignored
/// so reconnecting does not reset it either. The timestamp map is shared
/// by every in-flight request task and guarded by a mutex; lock poisoning
/// is unrecoverable.
pub struct RateLimitMiddleware {
    max_requests: usize,
    window: Duration,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimitMiddleware {
    /// Stock limits: 100 requests per 60-second window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }

    #[must_use]
    pub fn with_limits(max_requests: usize, window: Duration) -> Self {
        Self { max_requests, window, requests: Mutex::new(HashMap::new()) }
    }

    /// Records one arrival for `client` at `now` and reports whether it
    /// fits the window. Expired timestamps are pruned on the way.
    fn admit(&self, client: &str, now: Instant) -> bool {
        let mut requests = self.requests.lock().expect("rate limiter lock poisoned");
        let stamps = requests.entry(client.to_owned()).or_default();
        stamps.retain(|t| now.duration_since(*t) < self.window);
        if stamps.len() >= self.max_requests {
            return false;
        }
        stamps.push(now);
        true
    }
}

impl Default for RateLimitMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let client = ctx
            .head()
            .client
            .map_or_else(|| "unknown".to_owned(), |addr| addr.ip().to_string());

        if !self.admit(&client, Instant::now()) {
            tracing::warn!(%client, "rate limit exceeded");
            return error::rate_limited();
        }
        next.run(ctx).await
    }
}
