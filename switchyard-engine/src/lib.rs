//! The Switchyard dispatch engine.
//!
//! Assembles the routing core, the accelerated matcher, and the wire
//! bridge into one per-connection pipeline: middleware onion, dual-path
//! route resolution with guaranteed fallback, handler invocation with
//! fault capture, and result coercion into wire frames.
//!
//! See `docs/ARCHITECTURE.md` §5 for the pipeline walkthrough.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handler;
pub mod middleware;

pub use config::EngineConfig;
pub use dispatch::{BoxHandler, DualDispatcher};
pub use engine::{Engine, EngineBuilder, EngineStats};
pub use error::HandlerError;
pub use handler::{Handler, HandlerFn, Reply};
pub use middleware::{
    CompressionMiddleware, CorsMiddleware, Middleware, Next, RateLimitMiddleware, Session,
    SessionHandle, SessionMiddleware, TraceMiddleware,
};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use switchyard_core::Router;

    use crate::dispatch::{DispatchCore, DualDispatcher};

    /// A dispatch core over an empty table: everything resolves to 404.
    /// Lets middleware tests drive a real [`crate::middleware::Next`]
    /// without registering routes.
    pub(crate) fn empty_core() -> DispatchCore {
        DispatchCore::new(DualDispatcher::new(Arc::new(Router::new()), None), false)
    }
}
