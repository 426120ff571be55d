/// Errors produced when a path template or route registration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The template does not begin with `/`.
    #[error("template '{template}' must begin with '/'")]
    MissingLeadingSlash { template: String },

    /// The template contains an empty segment (`//` or a trailing `/`).
    #[error("template '{template}' contains an empty segment")]
    EmptySegment { template: String },

    /// A brace-delimited parameter does not span its whole segment.
    #[error("segment '{segment}' mixes literal text with a parameter")]
    PartialParam { segment: String },

    /// A parameter name is not a valid identifier.
    #[error("invalid parameter name '{name}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidParamName { name: String },

    /// A parameter references a converter that does not exist.
    #[error("unknown converter '{converter}' for parameter '{name}'")]
    UnknownConverter { name: String, converter: String },

    /// Two parameters in one template share a name.
    #[error("duplicate parameter name '{name}'")]
    DuplicateParam { name: String },

    /// The template declares more parameters than the supported maximum.
    #[error("template declares {count} parameters, the maximum is {limit}")]
    TooManyParams { count: usize, limit: usize },

    /// A route was registered with an empty method set.
    #[error("route '{template}' must allow at least one method")]
    EmptyMethods { template: String },
}

/// Errors produced when building a URL from a named route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum UrlError {
    /// No registered route carries the requested name.
    #[error("no route named '{name}'")]
    UnknownRoute { name: String },

    /// The value count does not match the template's parameter count.
    #[error("route '{name}' takes {expected} parameters, {got} were supplied")]
    ArityMismatch { name: String, expected: usize, got: usize },

    /// A supplied value does not match the declared converter kind.
    #[error("parameter '{param}' of route '{name}' expects {expected}, got {got}")]
    KindMismatch {
        name: String,
        param: String,
        expected: crate::convert::ParamKind,
        got: crate::convert::ParamKind,
    },
}
