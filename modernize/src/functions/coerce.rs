//! Parameter types and coercion of raw string values into typed arguments
//!
//! Coercion never fails: a value that does not parse is replaced by the
//! fallback of its type so one bad field never stops a transformation.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::definition::FunctionParameter;

/// Fallback for unparsable integers
pub const INTEGER_FALLBACK: i32 = i32::MIN;

/// Fallback for unparsable date-times: 0001-01-01T00:00:00Z
pub fn datetime_fallback() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Type vocabulary of function parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Bool,
    Guid,
    DateTime,
}

impl ParamType {
    /// Map a declared type name; unknown names are strings
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "integer" => ParamType::Integer,
            "bool" => ParamType::Bool,
            "guid" => ParamType::Guid,
            "datetime" => ParamType::DateTime,
            _ => ParamType::String,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Bool => "bool",
            ParamType::Guid => "guid",
            ParamType::DateTime => "datetime",
        }
    }

    /// Coerce a raw value into an argument of this type
    pub fn coerce(&self, raw: &str) -> Arg {
        match self {
            ParamType::String => Arg::String(raw.to_string()),
            ParamType::Integer => Arg::Integer(parse_integer(raw).unwrap_or(INTEGER_FALLBACK)),
            ParamType::Bool => Arg::Bool(parse_bool(raw).unwrap_or(false)),
            ParamType::Guid => Arg::Guid(parse_guid(raw).unwrap_or(Uuid::nil())),
            ParamType::DateTime => {
                Arg::DateTime(parse_datetime(raw).unwrap_or_else(datetime_fallback))
            }
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn parse_integer(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_guid(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %I:%M:%S %p",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// A coerced argument handed to a function
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    String(String),
    Integer(i32),
    Bool(bool),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
}

impl Arg {
    /// Text form of the argument
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Arg::String(s) => Cow::Borrowed(s),
            Arg::Integer(i) => Cow::Owned(i.to_string()),
            Arg::Bool(b) => Cow::Owned(b.to_string()),
            Arg::Guid(g) => Cow::Owned(g.to_string()),
            Arg::DateTime(dt) => Cow::Owned(dt.to_rfc3339()),
        }
    }
}

/// Positional arguments for one function call.
///
/// Accessors convert between types with the same fallbacks as coercion, so a
/// function declared with a `bool` parameter still works when the mapping
/// passed a string literal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new(args: Vec<Arg>) -> Self {
        Args(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    /// Argument as text; missing arguments are empty
    pub fn text(&self, index: usize) -> Cow<'_, str> {
        self.0
            .get(index)
            .map(Arg::as_text)
            .unwrap_or(Cow::Borrowed(""))
    }

    pub fn bool(&self, index: usize) -> bool {
        match self.0.get(index) {
            Some(Arg::Bool(b)) => *b,
            Some(Arg::String(s)) => parse_bool(s).unwrap_or(false),
            _ => false,
        }
    }

    pub fn integer(&self, index: usize) -> i32 {
        match self.0.get(index) {
            Some(Arg::Integer(i)) => *i,
            Some(Arg::String(s)) => parse_integer(s).unwrap_or(INTEGER_FALLBACK),
            _ => INTEGER_FALLBACK,
        }
    }

    pub fn guid(&self, index: usize) -> Uuid {
        match self.0.get(index) {
            Some(Arg::Guid(g)) => *g,
            Some(Arg::String(s)) => parse_guid(s).unwrap_or(Uuid::nil()),
            _ => Uuid::nil(),
        }
    }

    pub fn datetime(&self, index: usize) -> DateTime<Utc> {
        match self.0.get(index) {
            Some(Arg::DateTime(dt)) => *dt,
            Some(Arg::String(s)) => parse_datetime(s).unwrap_or_else(datetime_fallback),
            _ => datetime_fallback(),
        }
    }
}

/// Coerce parameters in declared order
pub fn coerce(params: &[FunctionParameter]) -> Args {
    Args(
        params
            .iter()
            .map(|p| p.param_type.coerce(&p.value))
            .collect(),
    )
}
