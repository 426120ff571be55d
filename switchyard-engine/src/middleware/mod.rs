//! The middleware onion around dispatch.
//!
//! Middleware are ordered wrappers: the first registered runs outermost,
//! seeing the request first and the response last. Each one receives a
//! [`Next`] and may refuse to call it, which short-circuits everything
//! inside, matching included.

use std::sync::Arc;

use async_trait::async_trait;

use switchyard_wire::{RequestContext, Response};

use crate::dispatch::DispatchCore;

mod compress;
mod cors;
mod rate_limit;
mod session;
mod trace;

pub use compress::CompressionMiddleware;
pub use cors::CorsMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use session::{Session, SessionHandle, SessionMiddleware};
pub use trace::TraceMiddleware;

/// One layer of the onion.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handles one request, deciding whether and when to run the rest of
    /// the chain via `next`.
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response;
}

/// The remainder of the chain, ending in the dispatch core.
///
/// Consuming `run` once is the whole contract; dropping a `Next` without
/// running it is the short-circuit.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    core: &'a DispatchCore,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], core: &'a DispatchCore) -> Self {
        Self { chain, core }
    }

    /// Runs the next layer, or the dispatch core when the chain is spent.
    pub async fn run(mut self, ctx: &mut RequestContext) -> Response {
        if let Some((layer, rest)) = self.chain.split_first() {
            self.chain = rest;
            layer.handle(ctx, self).await
        } else {
            self.core.dispatch(ctx).await
        }
    }
}
