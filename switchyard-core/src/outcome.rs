use http::Method;

use crate::convert::{ParamKind, ParamValue};
use crate::route::{MethodSet, RouteId};

/// Converted path parameters of a matched route, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathParams {
    pairs: Vec<(String, ParamValue)>,
}

impl PathParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from already-converted pairs. Order must be the template's
    /// declaration order.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, ParamValue)>) -> Self {
        Self { pairs }
    }

    /// Appends one converted parameter.
    pub fn push(&mut self, name: impl Into<String>, value: ParamValue) {
        self.pairs.push((name.into(), value));
    }

    /// Looks a parameter up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A successful match: which route won and its converted parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub route: RouteId,
    pub params: PathParams,
}

/// A parameter capture that its declared converter rejected.
///
/// This is a terminal matching outcome: once the winning route's
/// conversion fails, no later route is consulted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path parameter '{name}' rejected by the {kind} converter: '{value}'")]
pub struct ParamError {
    pub route: RouteId,
    pub name: String,
    pub value: String,
    pub kind: ParamKind,
}

/// Every way a `(method, path)` resolution can end.
///
/// Outcomes are values, not errors: 404/405/400 are ordinary results of a
/// scan, and both matcher implementations must produce them identically
/// for identical tables. The enum is a closed union so dispatch code can
/// match it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A route matched structurally, allowed the method, and all captures
    /// converted.
    Matched(RouteMatch),
    /// No registered template has the path's shape.
    NotFound,
    /// At least one template matched structurally but none of those routes
    /// allows the method; `allowed` is the canonical union of their method
    /// sets.
    MethodNotAllowed { allowed: MethodSet },
    /// The winning route's captures failed conversion.
    InvalidParam(ParamError),
}

impl MatchOutcome {
    /// Whether this outcome is a full match.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// An internal fault inside a matcher implementation.
///
/// Faults are strictly distinct from negative outcomes: `NotFound` is an
/// answer, a fault means the implementation could not answer at all. The
/// dispatcher absorbs faults by falling back to the reference matcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("matcher fault: {reason}")]
pub struct MatcherFault {
    pub reason: String,
}

impl MatcherFault {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// The contract every route matcher implements.
///
/// Implementations must agree on outcomes for identical route tables; the
/// reference scan never faults, accelerated implementations may.
pub trait Matcher: Send + Sync {
    /// Resolves a request line to an outcome.
    ///
    /// # Errors
    /// Returns [`MatcherFault`] when the implementation detects an
    /// internal inconsistency. Negative outcomes are not errors.
    fn resolve(&self, method: &Method, path: &str) -> Result<MatchOutcome, MatcherFault>;
}
