//! Dual-path route resolution and the dispatch core.
//!
//! The dispatcher holds the sealed reference router and, when one was
//! built, an accelerated matcher behind the shared [`Matcher`] contract.
//! Selection happens once at engine build time; per request the
//! accelerated path is tried first and any internal fault falls back to
//! the reference scan, logged but invisible to the caller. Negative
//! outcomes (404/405/400) are answers, not faults, and never trigger
//! fallback.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use http::Method;

use switchyard_core::{MatchOutcome, Matcher, Route, RouteId, Router};
use switchyard_wire::{RequestContext, Response};

use crate::error;
use crate::handler::Handler;

/// The handler type every registered route carries at dispatch time.
pub type BoxHandler = Arc<dyn Handler>;

/// Picks between the accelerated matcher and the reference scan.
pub struct DualDispatcher {
    reference: Arc<Router<BoxHandler>>,
    accelerated: Option<Arc<dyn Matcher>>,
}

impl DualDispatcher {
    /// Builds a dispatcher over a sealed table. `accelerated == None`
    /// means every resolution runs the reference scan.
    #[must_use]
    pub fn new(reference: Arc<Router<BoxHandler>>, accelerated: Option<Arc<dyn Matcher>>) -> Self {
        Self { reference, accelerated }
    }

    /// Whether an accelerated matcher is installed.
    #[must_use]
    pub fn is_accelerated(&self) -> bool {
        self.accelerated.is_some()
    }

    /// Resolves one request line.
    ///
    /// For one table the outcome is identical whichever implementation
    /// answers; a fault in the accelerated path is logged and the
    /// reference scan retries the same request line.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> MatchOutcome {
        if let Some(fast) = &self.accelerated {
            match fast.resolve(method, path) {
                Ok(outcome) => return outcome,
                Err(fault) => {
                    tracing::error!(
                        %fault,
                        %method,
                        path,
                        "accelerated matcher fault, retrying on the reference scan"
                    );
                }
            }
        }
        self.reference.resolve(method, path)
    }

    /// Looks up a resolved route in the sealed table.
    #[must_use]
    pub fn route(&self, id: RouteId) -> Option<&Route<BoxHandler>> {
        self.reference.route(id)
    }
}

/// The innermost stage of the middleware onion: resolve, run the handler,
/// coerce, and turn every fault into an enveloped response.
pub(crate) struct DispatchCore {
    dispatcher: DualDispatcher,
    debug: bool,
}

impl DispatchCore {
    pub(crate) fn new(dispatcher: DualDispatcher, debug: bool) -> Self {
        Self { dispatcher, debug }
    }

    pub(crate) fn dispatcher(&self) -> &DualDispatcher {
        &self.dispatcher
    }

    pub(crate) async fn dispatch(&self, ctx: &mut RequestContext) -> Response {
        let matched = match self.dispatcher.resolve(ctx.method(), ctx.path()) {
            MatchOutcome::Matched(matched) => matched,
            MatchOutcome::NotFound => return error::not_found(ctx.path()),
            MatchOutcome::MethodNotAllowed { allowed } => {
                return error::method_not_allowed(&allowed);
            }
            MatchOutcome::InvalidParam(e) => return error::invalid_param(&e),
        };

        let Some(route) = self.dispatcher.route(matched.route) else {
            // Both matchers answered with an id the sealed table does not
            // know; the table cannot have changed, so this is a defect.
            tracing::error!(route = %matched.route, "matched route missing from the sealed table");
            return error::server_error(self.debug, "route table inconsistency");
        };
        let handler = Arc::clone(&route.handler);
        ctx.set_params(matched.params);

        let outcome = std::panic::AssertUnwindSafe(handler.call(ctx)).catch_unwind().await;
        match outcome {
            Ok(Ok(reply)) => reply.into_response(),
            Ok(Err(fault)) => {
                tracing::error!(error = %fault, path = ctx.path(), "handler fault");
                error::server_error(self.debug, &fault.to_string())
            }
            Err(payload) => {
                let detail = panic_detail(payload.as_ref());
                tracing::error!(%detail, path = ctx.path(), "handler panicked");
                error::server_error(self.debug, &detail)
            }
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
