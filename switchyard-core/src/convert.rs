use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of parameter converters a template may name.
///
/// `{name}` defaults to [`ParamKind::Str`]; `{name:int}`, `{name:float}`
/// and `{name:uuid}` select the typed converters. The set is closed so the
/// scan and trie matchers can be proven to convert identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Any non-empty run of characters within one segment.
    Str,
    /// ASCII digits parsed to `i64`. No sign, no leading `+`.
    Int,
    /// `digits` or `digits.digits` parsed to `f64`. No sign, no leading dot.
    Float,
    /// Lowercase hyphenated UUID (8-4-4-4-12).
    Uuid,
}

impl ParamKind {
    /// Looks up a converter by the name used in templates.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }

    /// Returns the template-facing converter name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Uuid => "uuid",
        }
    }

    /// Converts one raw captured segment, or `None` when the capture does
    /// not satisfy this kind.
    ///
    /// The shape checks are deliberately narrower than the standard-library
    /// parsers: `int` and `float` accept digits only (no sign, no exponent,
    /// no leading dot) and `uuid` accepts the lowercase hyphenated form
    /// only. Anything else belongs to the `str` kind.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<ParamValue> {
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::Str => Some(ParamValue::Str(raw.to_owned())),
            Self::Int => {
                if !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                raw.parse::<i64>().ok().map(ParamValue::Int)
            }
            Self::Float => {
                let (int_part, frac_part) = match raw.split_once('.') {
                    Some((i, f)) => (i, Some(f)),
                    None => (raw, None),
                };
                if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                if let Some(frac) = frac_part {
                    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                }
                raw.parse::<f64>().ok().map(ParamValue::Float)
            }
            Self::Uuid => {
                if !is_lower_hyphenated_uuid(raw) {
                    return None;
                }
                Uuid::parse_str(raw).ok().map(ParamValue::Uuid)
            }
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_lower_hyphenated_uuid(raw: &str) -> bool {
    if raw.len() != 36 {
        return false;
    }
    raw.bytes().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_digit() || (b'a'..=b'f').contains(&b),
    })
}

/// A path parameter after conversion.
///
/// `Display` is the serialization side of the converter: formatting a
/// value that was produced by [`ParamKind::parse`] yields a segment that
/// matches the same template again, which is what reverse URL building
/// relies on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
}

impl ParamValue {
    /// Returns the kind that produced (or would produce) this value.
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        match self {
            Self::Str(_) => ParamKind::Str,
            Self::Int(_) => ParamKind::Int,
            Self::Float(_) => ParamKind::Float,
            Self::Uuid(_) => ParamKind::Uuid,
        }
    }

    /// Returns the inner string for `Str` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner integer for `Int` values.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner float for `Float` values.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner UUID for `Uuid` values.
    #[must_use]
    pub const fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Uuid> for ParamValue {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}
