use http::Method;

use switchyard_core::template::{split_path, CompiledPath, ParamSpec, Segment};
use switchyard_core::{
    MatchOutcome, Matcher, MatcherFault, MethodSet, ParamError, PathParams, RouteId, RouteMatch,
    Router,
};

use crate::trie::{SegmentTrie, ROOT};

/// Per-route data the selection step needs after the structural walk:
/// the method set and where in the path each declared parameter sits.
#[derive(Debug)]
struct RouteInfo {
    methods: MethodSet,
    params: Vec<(usize, ParamSpec)>,
}

/// The accelerated matcher: a segment trie walked with a node frontier.
///
/// The walk takes literal and parameter edges in parallel and collects
/// every route whose template ends where the path ends, in registration
/// order. Selection then applies the same rule as the reference scan:
/// the earliest-registered candidate that allows the method wins,
/// method-denied candidates feed the 405 union, and a converter rejection
/// on the winner terminates resolution as `InvalidParam`.
///
/// The structure walk shares no code with the reference scan; conversion
/// goes through the same `ParamKind::parse`, so converted values cannot
/// diverge between the two. Equivalence of the structural side is covered
/// by a generated-corpus test rather than by construction.
#[derive(Debug)]
pub struct TrieMatcher {
    trie: SegmentTrie,
    routes: Vec<RouteInfo>,
}

impl TrieMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self { trie: SegmentTrie::new(), routes: Vec::new() }
    }

    /// Builds a matcher mirroring every route of `router`, in order, so
    /// route ids line up with the router's ids.
    #[must_use]
    pub fn from_router<H>(router: &Router<H>) -> Self {
        let mut matcher = Self::new();
        for route in router.routes() {
            matcher.insert(&route.path, &route.methods);
        }
        matcher
    }

    /// Mirrors one registered route. Must be called in registration order
    /// with the route's effective (already canonical) method set; the
    /// returned id equals the insertion index.
    pub fn insert(&mut self, path: &CompiledPath, methods: &MethodSet) -> RouteId {
        let mut node = ROOT;
        let mut params = Vec::with_capacity(path.param_count());
        for (position, segment) in path.segments().iter().enumerate() {
            node = match segment {
                Segment::Literal(lit) => self.trie.descend_literal(node, lit),
                Segment::Param(spec) => {
                    params.push((position, spec.clone()));
                    self.trie.descend_param(node)
                }
            };
        }

        let id = RouteId(self.routes.len());
        self.trie.mark_terminal(node, id);
        self.routes.push(RouteInfo { methods: methods.clone(), params });
        id
    }

    /// Number of mirrored routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn resolve_parts(&self, method: &Method, parts: &[&str]) -> Result<MatchOutcome, MatcherFault> {
        let candidates = self.trie.candidates(parts)?;

        let mut allowed: Option<MethodSet> = None;
        for id in candidates {
            let info = self.routes.get(id.index()).ok_or_else(|| {
                MatcherFault::new(format!("terminal references unknown route {id}"))
            })?;

            if !info.methods.contains(method) {
                allowed = Some(match allowed {
                    Some(set) => set.union(&info.methods),
                    None => info.methods.clone(),
                });
                continue;
            }

            let mut values = PathParams::new();
            for (position, spec) in &info.params {
                let raw = *parts.get(*position).ok_or_else(|| {
                    MatcherFault::new(format!(
                        "route {id} expects a segment at {position}, path has {}",
                        parts.len()
                    ))
                })?;
                match spec.kind.parse(raw) {
                    Some(value) => values.push(spec.name.clone(), value),
                    None => {
                        return Ok(MatchOutcome::InvalidParam(ParamError {
                            route: id,
                            name: spec.name.clone(),
                            value: raw.to_owned(),
                            kind: spec.kind,
                        }));
                    }
                }
            }
            return Ok(MatchOutcome::Matched(RouteMatch { route: id, params: values }));
        }

        Ok(match allowed {
            Some(allowed) => MatchOutcome::MethodNotAllowed { allowed },
            None => MatchOutcome::NotFound,
        })
    }
}

impl Default for TrieMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher for TrieMatcher {
    fn resolve(&self, method: &Method, path: &str) -> Result<MatchOutcome, MatcherFault> {
        match split_path(path) {
            Some(parts) => self.resolve_parts(method, &parts),
            None => Ok(MatchOutcome::NotFound),
        }
    }
}
