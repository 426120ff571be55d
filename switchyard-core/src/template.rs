use serde::Serialize;

use crate::convert::ParamKind;
use crate::error::CompileError;

/// Maximum number of parameters one template may declare.
pub const MAX_PARAMS: usize = 20;

/// One declared parameter of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
}

/// One segment of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matched byte-for-byte.
    Literal(String),
    /// Captures exactly one non-empty path segment.
    Param(ParamSpec),
}

/// A path template compiled into its segment sequence.
///
/// Templates look like `/users/{id:int}/posts/{slug}`: a parameter spans a
/// whole segment, `{name}` defaults to the `str` converter, and
/// `{name:kind}` selects one of the closed converter set. Compilation is
/// deterministic and never touches the network or clock, so it is safe to
/// run during startup route registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    template: String,
    segments: Vec<Segment>,
    param_count: usize,
}

impl CompiledPath {
    /// Compiles a template.
    ///
    /// # Errors
    /// Returns [`CompileError`] when the template does not begin with `/`,
    /// contains an empty or mixed segment, names an unknown converter,
    /// repeats a parameter name, or declares more than [`MAX_PARAMS`]
    /// parameters.
    pub fn compile(template: &str) -> Result<Self, CompileError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(CompileError::MissingLeadingSlash { template: template.to_owned() });
        };

        let mut segments = Vec::new();
        let mut param_count = 0;
        if !rest.is_empty() {
            for raw in rest.split('/') {
                let segment = parse_segment(template, raw)?;
                if let Segment::Param(spec) = &segment {
                    if segments.iter().any(|s| matches!(s, Segment::Param(p) if p.name == spec.name)) {
                        return Err(CompileError::DuplicateParam { name: spec.name.clone() });
                    }
                    param_count += 1;
                }
                segments.push(segment);
            }
        }

        if param_count > MAX_PARAMS {
            return Err(CompileError::TooManyParams { count: param_count, limit: MAX_PARAMS });
        }

        Ok(Self { template: template.to_owned(), segments, param_count })
    }

    /// Returns the source template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the compiled segment sequence. The root template `/` has
    /// zero segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the declared parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(spec) => Some(spec),
            Segment::Literal(_) => None,
        })
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Structural probe: returns the raw captured segments (declaration
    /// order) when `path` has this template's shape, without running any
    /// converter. Matching is exact — no trailing-slash tolerance, no
    /// percent-decoding.
    #[must_use]
    pub fn match_path<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        let parts = split_path(path)?;
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut captures = Vec::with_capacity(self.param_count);
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(_) => {
                    if part.is_empty() {
                        return None;
                    }
                    captures.push(part);
                }
            }
        }
        Some(captures)
    }
}

/// Splits a request path into segments. `/` has zero segments; a path not
/// starting with `/` has no segmentation at all.
///
/// Every matcher implementation uses this one segmentation convention, so
/// "structure" means the same thing to all of them.
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    Some(rest.split('/').collect())
}

fn parse_segment(template: &str, raw: &str) -> Result<Segment, CompileError> {
    if raw.is_empty() {
        return Err(CompileError::EmptySegment { template: template.to_owned() });
    }
    if !raw.contains(['{', '}']) {
        return Ok(Segment::Literal(raw.to_owned()));
    }

    // A parameter must span the whole segment: `{name}` or `{name:kind}`.
    let inner = raw
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|s| !s.contains(['{', '}']))
        .ok_or_else(|| CompileError::PartialParam { segment: raw.to_owned() })?;

    let (name, converter) = match inner.split_once(':') {
        Some((n, c)) => (n, Some(c)),
        None => (inner, None),
    };

    if !is_identifier(name) {
        return Err(CompileError::InvalidParamName { name: name.to_owned() });
    }

    let kind = match converter {
        None => ParamKind::Str,
        Some(c) => ParamKind::from_name(c).ok_or_else(|| CompileError::UnknownConverter {
            name: name.to_owned(),
            converter: c.to_owned(),
        })?,
    };

    Ok(Segment::Param(ParamSpec { name: name.to_owned(), kind }))
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
