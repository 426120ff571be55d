use http::Method;

use crate::convert::ParamValue;
use crate::error::{CompileError, UrlError};
use crate::outcome::{MatchOutcome, Matcher, MatcherFault, ParamError, PathParams, RouteMatch};
use crate::route::{MethodSet, Route, RouteId};
use crate::template::{CompiledPath, Segment};

/// The reference matcher: an ordered route table resolved by linear scan.
///
/// Registration order is the precedence contract. The scan visits routes
/// in that order and the first route whose template matches the path
/// structurally *and* whose method set allows the request method wins,
/// regardless of how specific any later route is. Structural matches with
/// a denied method keep scanning but contribute their methods to the 405
/// union. Once a winner is chosen, converter failure on its captures ends
/// the whole resolution as `InvalidParam` — later routes are not retried.
///
/// The table is append-only: routes are registered before serving starts
/// and never change afterwards, so resolution needs no synchronization.
#[derive(Debug, Clone)]
pub struct Router<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compiles `template` and appends a route answering `methods`.
    ///
    /// Registering `GET` implies `HEAD`.
    ///
    /// # Errors
    /// Returns [`CompileError`] when the template is malformed or the
    /// method set is empty.
    pub fn add_route(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        template: &str,
        handler: H,
    ) -> Result<RouteId, CompileError> {
        self.register(methods, template, handler, None)
    }

    /// Like [`Router::add_route`], additionally naming the route for
    /// reverse URL building.
    ///
    /// # Errors
    /// Returns [`CompileError`] when the template is malformed or the
    /// method set is empty.
    pub fn add_named_route(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        template: &str,
        handler: H,
        name: &str,
    ) -> Result<RouteId, CompileError> {
        self.register(methods, template, handler, Some(name.to_owned()))
    }

    fn register(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        template: &str,
        handler: H,
        name: Option<String>,
    ) -> Result<RouteId, CompileError> {
        let path = CompiledPath::compile(template)?;
        let methods = MethodSet::new(methods).with_implied_head();
        if methods.is_empty() {
            return Err(CompileError::EmptyMethods { template: template.to_owned() });
        }
        let id = RouteId(self.routes.len());
        self.routes.push(Route { path, methods, handler, name });
        Ok(id)
    }

    /// Resolves a request line by scanning the table in registration
    /// order. Never fails; every request line has an outcome.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> MatchOutcome {
        let mut allowed: Option<MethodSet> = None;

        for (ix, route) in self.routes.iter().enumerate() {
            let Some(captures) = route.path.match_path(path) else {
                continue;
            };
            if !route.methods.contains(method) {
                allowed = Some(match allowed {
                    Some(set) => set.union(&route.methods),
                    None => route.methods.clone(),
                });
                continue;
            }
            return convert_winner(RouteId(ix), &route.path, &captures);
        }

        match allowed {
            Some(allowed) => MatchOutcome::MethodNotAllowed { allowed },
            None => MatchOutcome::NotFound,
        }
    }

    /// Builds a path for the first route registered under `name`.
    ///
    /// Values are matched positionally against the template's parameters
    /// and serialized through their converter's `Display` form, so the
    /// produced path re-matches the same route.
    ///
    /// # Errors
    /// Returns [`UrlError`] for an unknown name, a value-count mismatch,
    /// or a value whose kind differs from the declared converter.
    pub fn url_for(&self, name: &str, values: &[ParamValue]) -> Result<String, UrlError> {
        let route = self
            .routes
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .ok_or_else(|| UrlError::UnknownRoute { name: name.to_owned() })?;

        let expected = route.path.param_count();
        if values.len() != expected {
            return Err(UrlError::ArityMismatch {
                name: name.to_owned(),
                expected,
                got: values.len(),
            });
        }

        let mut out = String::new();
        let mut next_value = values.iter();
        for segment in route.path.segments() {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param(spec) => {
                    // Arity was checked above, one value per param spec.
                    let Some(value) = next_value.next() else {
                        return Err(UrlError::ArityMismatch {
                            name: name.to_owned(),
                            expected,
                            got: values.len(),
                        });
                    };
                    if value.kind() != spec.kind {
                        return Err(UrlError::KindMismatch {
                            name: name.to_owned(),
                            param: spec.name.clone(),
                            expected: spec.kind,
                            got: value.kind(),
                        });
                    }
                    out.push_str(&value.to_string());
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }

    /// The registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    /// Looks a route up by id.
    #[must_use]
    pub fn route(&self, id: RouteId) -> Option<&Route<H>> {
        self.routes.get(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Converts the winning route's captures in declaration order. The first
/// converter rejection ends the resolution.
fn convert_winner(id: RouteId, path: &CompiledPath, captures: &[&str]) -> MatchOutcome {
    let mut params = PathParams::new();
    for (spec, raw) in path.params().zip(captures) {
        match spec.kind.parse(raw) {
            Some(value) => params.push(spec.name.clone(), value),
            None => {
                return MatchOutcome::InvalidParam(ParamError {
                    route: id,
                    name: spec.name.clone(),
                    value: (*raw).to_owned(),
                    kind: spec.kind,
                });
            }
        }
    }
    MatchOutcome::Matched(RouteMatch { route: id, params })
}

impl<H: Send + Sync> Matcher for Router<H> {
    fn resolve(&self, method: &Method, path: &str) -> Result<MatchOutcome, MatcherFault> {
        Ok(Self::resolve(self, method, path))
    }
}
