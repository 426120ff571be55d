//! Request tracing.

use std::time::Instant;

use async_trait::async_trait;

use switchyard_wire::{RequestContext, Response};

use crate::middleware::{Middleware, Next};

/// Logs one structured line per request: method, path, status, elapsed.
///
/// Sits outermost in the default chain so the elapsed time covers the
/// whole onion, short-circuits included.
pub struct TraceMiddleware;

#[async_trait]
impl Middleware for TraceMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let method = ctx.method().clone();
        let path = ctx.path().to_owned();
        let start = Instant::now();

        let response = next.run(ctx).await;

        tracing::info!(
            %method,
            %path,
            status = response.status.as_u16(),
            elapsed = ?start.elapsed(),
            "request complete"
        );
        response
    }
}
