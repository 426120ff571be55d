use std::fmt;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::template::CompiledPath;

/// Index of a route in its table's registration order.
///
/// Lower ids were registered earlier, and earlier registration wins every
/// tie during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(pub usize);

impl RouteId {
    /// Returns the raw table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for RouteId {
    fn from(ix: usize) -> Self {
        Self(ix)
    }
}

/// A canonical set of HTTP methods.
///
/// Stored sorted and deduplicated, so two sets built from differently
/// ordered inputs compare equal and unions are order-independent. That
/// keeps `MethodNotAllowed` outcomes identical across matcher
/// implementations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodSet {
    methods: Vec<Method>,
}

impl MethodSet {
    /// Builds a canonical set from any iterator of methods.
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        let mut methods: Vec<Method> = methods.into_iter().collect();
        methods.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        Self { methods }
    }

    /// Adds `HEAD` whenever `GET` is present, mirroring the usual server
    /// convention that a GET handler also answers HEAD.
    #[must_use]
    pub fn with_implied_head(self) -> Self {
        if self.contains(&Method::GET) && !self.contains(&Method::HEAD) {
            let mut methods = self.methods;
            methods.push(Method::HEAD);
            Self::new(methods)
        } else {
            self
        }
    }

    /// Whether the set contains `method`.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Canonical union of two sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.methods.iter().chain(&other.methods).cloned())
    }

    /// The methods in canonical (sorted) order.
    #[must_use]
    pub fn as_slice(&self) -> &[Method] {
        &self.methods
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Display for MethodSet {
    /// Formats as an `Allow`-header value: `GET, HEAD, POST`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(method.as_str())?;
        }
        Ok(())
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// One registered route: a compiled template, the methods it answers, the
/// handler it dispatches to, and an optional name for reverse URL
/// building.
///
/// Routes are immutable once registered; the table they live in is
/// append-only before serving and read-only after.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub path: CompiledPath,
    pub methods: MethodSet,
    pub handler: H,
    pub name: Option<String>,
}
