//! The engine surface: builder, sealed engine, per-connection pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use serde::Serialize;

use switchyard_core::{CompileError, Matcher, ParamValue, RouteId, Router, UrlError};
use switchyard_wire::{ConnectionHead, RequestContext, Response, WireError, WireReceiver, WireSender};

use crate::config::EngineConfig;
use crate::dispatch::{BoxHandler, DispatchCore, DualDispatcher};
use crate::error;
use crate::handler::Handler;
use crate::middleware::{CompressionMiddleware, Middleware, Next, TraceMiddleware};

/// Collects routes and middleware, then seals them into an [`Engine`].
///
/// Registration is a setup-time activity: the builder is the only mutable
/// phase, and [`EngineBuilder::build`] fixes the table, the matcher
/// strategy, and the chain for the process lifetime.
pub struct EngineBuilder {
    config: EngineConfig,
    router: Router<BoxHandler>,
    middleware: Vec<Arc<dyn Middleware>>,
    accelerated: Option<Arc<dyn Matcher>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config, router: Router::new(), middleware: Vec::new(), accelerated: None }
    }

    /// Registers a route for `methods`.
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template or an empty
    /// method set.
    pub fn register(
        &mut self,
        methods: &[Method],
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<RouteId, CompileError> {
        self.router.add_route(methods.iter().cloned(), template, Arc::new(handler))
    }

    /// Like [`EngineBuilder::register`], additionally naming the route
    /// for reverse URL building.
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template or an empty
    /// method set.
    pub fn register_named(
        &mut self,
        methods: &[Method],
        template: &str,
        handler: impl Handler + 'static,
        name: &str,
    ) -> Result<RouteId, CompileError> {
        self.router
            .add_named_route(methods.iter().cloned(), template, Arc::new(handler), name)
    }

    /// Registers a `GET` route (which also answers `HEAD`).
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template.
    pub fn get(
        &mut self,
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<RouteId, CompileError> {
        self.register(&[Method::GET], template, handler)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template.
    pub fn post(
        &mut self,
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<RouteId, CompileError> {
        self.register(&[Method::POST], template, handler)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template.
    pub fn put(
        &mut self,
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<RouteId, CompileError> {
        self.register(&[Method::PUT], template, handler)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template.
    pub fn delete(
        &mut self,
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<RouteId, CompileError> {
        self.register(&[Method::DELETE], template, handler)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    /// Returns [`CompileError`] for a malformed template.
    pub fn patch(
        &mut self,
        template: &str,
        handler: impl Handler + 'static,
    ) -> Result<RouteId, CompileError> {
        self.register(&[Method::PATCH], template, handler)
    }

    /// Appends a middleware layer. The first appended runs outermost
    /// (after the default layers).
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Overrides the accelerated matcher. Meant for fault injection and
    /// for callers that bring their own matcher; the default is the trie
    /// matcher when the `express` feature is on.
    pub fn accelerated(&mut self, matcher: Arc<dyn Matcher>) -> &mut Self {
        self.accelerated = Some(matcher);
        self
    }

    /// Seals the route table, fixes the matcher strategy, and assembles
    /// the middleware chain.
    #[must_use]
    pub fn build(self) -> Engine {
        let router = Arc::new(self.router);
        let accelerated = self.accelerated.or_else(|| default_matcher(&router));

        let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();
        if self.config.trace {
            chain.push(Arc::new(TraceMiddleware));
        }
        if self.config.compression {
            chain.push(Arc::new(CompressionMiddleware::with_minimum_size(
                self.config.compression_min_size,
            )));
        }
        chain.extend(self.middleware);

        let dispatcher = DualDispatcher::new(Arc::clone(&router), accelerated);
        tracing::info!(
            routes = router.len(),
            middleware = chain.len(),
            accelerated = dispatcher.is_accelerated(),
            "engine built"
        );

        Engine {
            core: DispatchCore::new(dispatcher, self.config.debug),
            chain,
            router,
            config: self.config,
            started: Instant::now(),
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "express")]
fn default_matcher(router: &Arc<Router<BoxHandler>>) -> Option<Arc<dyn Matcher>> {
    Some(Arc::new(switchyard_express::TrieMatcher::from_router(router.as_ref())))
}

#[cfg(not(feature = "express"))]
fn default_matcher(_router: &Arc<Router<BoxHandler>>) -> Option<Arc<dyn Matcher>> {
    None
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct EngineStats {
    pub uptime: Duration,
    pub routes: usize,
    pub middleware: usize,
    pub accelerated: bool,
}

/// A sealed dispatch engine.
///
/// Everything inside is read-only (or internally synchronized), so one
/// engine is shared across connection tasks behind an `Arc` without
/// further locking. Drivers call [`Engine::handle`] once per connection.
pub struct Engine {
    chain: Vec<Arc<dyn Middleware>>,
    core: DispatchCore,
    router: Arc<Router<BoxHandler>>,
    config: EngineConfig,
    started: Instant,
}

impl Engine {
    /// Runs one connection end to end: middleware onion, dispatch,
    /// response frames. The configured timeout wraps the whole pipeline;
    /// expiry writes a 503. Cancelling the returned future stops the
    /// request wherever it is suspended, with no detached work left over.
    ///
    /// # Errors
    /// Returns [`WireError`] when the driver stopped listening before the
    /// response was fully written.
    pub async fn handle<R, S>(
        &self,
        head: ConnectionHead,
        receiver: R,
        sender: &mut S,
    ) -> Result<(), WireError>
    where
        R: WireReceiver + 'static,
        S: WireSender + ?Sized,
    {
        let head_only = head.method == Method::HEAD;
        let mut ctx = RequestContext::new(head, receiver);

        let response = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run(&mut ctx)).await {
                Ok(response) => response,
                Err(_) => {
                    tracing::error!(path = ctx.path(), ?limit, "pipeline timed out");
                    error::timed_out()
                }
            },
            None => self.run(&mut ctx).await,
        };

        response.write(sender, head_only).await
    }

    async fn run(&self, ctx: &mut RequestContext) -> Response {
        Next::new(&self.chain, &self.core).run(ctx).await
    }

    /// The sealed route table, for reverse URL building and inspection.
    #[must_use]
    pub fn router(&self) -> &Router<BoxHandler> {
        &self.router
    }

    /// Builds a path for a named route.
    ///
    /// # Errors
    /// Returns [`UrlError`] for an unknown name or mismatched values.
    pub fn url_for(&self, name: &str, values: &[ParamValue]) -> Result<String, UrlError> {
        self.router.url_for(name, values)
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            uptime: self.started.elapsed(),
            routes: self.router.len(),
            middleware: self.chain.len(),
            accelerated: self.core.dispatcher().is_accelerated(),
        }
    }
}
