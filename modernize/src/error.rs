//! Error types shared by the function engine and its collaborators

use std::fmt;

/// What went wrong while parsing a function expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Expression has no opening parenthesis
    MissingParenthesis,
    /// Nothing before the opening parenthesis
    EmptyFunctionName,
    /// A `{placeholder}` references a property the mapping does not declare
    UndeclaredParameter { parameter: String },
}

/// Parse error with position information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub position: usize,
    pub context: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, message: impl Into<String>, position: usize, context: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
            context: context.chars().take(40).collect(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Transformation rule a built-in function refuses to break.
///
/// These stop the current content unit; the page-building layer decides
/// whether that means skipping the web part or the whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// A page file is referenced that cannot exist on the target site
    PageNotAvailableAtTarget { path: String },
    /// A media control has no video source configured
    MediaSourceMissing { web_part: String },
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::PageNotAvailableAtTarget { path } => {
                write!(f, "page '{}' is not available at the target site", path)
            }
            PolicyViolation::MediaSourceMissing { web_part } => {
                write!(f, "media control '{}' has no source configured", web_part)
            }
        }
    }
}

impl std::error::Error for PolicyViolation {}

/// Error from parsing or dispatching a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    Parse(ParseError),
    /// Number of inputs does not match the function's parameter list
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },
    /// A selector returned something other than text or a boolean
    NonScalarSelector { selector: String },
    Policy(PolicyViolation),
}

impl FunctionError {
    /// Errors that only abort the chain of the property being processed
    pub fn is_chain_local(&self) -> bool {
        matches!(self, FunctionError::Parse(_) | FunctionError::ArgumentCount { .. })
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionError::Parse(e) => write!(f, "parse error {}", e),
            FunctionError::ArgumentCount {
                function,
                expected,
                actual,
            } => write!(
                f,
                "function '{}' takes {} parameter(s) but {} were supplied",
                function, expected, actual
            ),
            FunctionError::NonScalarSelector { selector } => {
                write!(f, "selector '{}' returned multiple values", selector)
            }
            FunctionError::Policy(v) => write!(f, "{}", v),
        }
    }
}

impl std::error::Error for FunctionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FunctionError::Parse(e) => Some(e),
            FunctionError::Policy(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ParseError> for FunctionError {
    fn from(e: ParseError) -> Self {
        FunctionError::Parse(e)
    }
}

impl From<PolicyViolation> for FunctionError {
    fn from(v: PolicyViolation) -> Self {
        FunctionError::Policy(v)
    }
}

/// Failure reported by the remote collaboration layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The operation is not supported by this source
    NotAvailable,
    Remote { message: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::NotAvailable => write!(f, "operation not available on this source"),
            SourceError::Remote { message } => write!(f, "remote error: {}", message),
        }
    }
}

impl std::error::Error for SourceError {}

/// Failure while persisting a transferred asset
#[derive(Debug)]
pub enum AssetError {
    Io(std::io::Error),
    InvalidFileName(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io(e) => write!(f, "asset write failed: {}", e),
            AssetError::InvalidFileName(name) => write!(f, "invalid asset file name '{}'", name),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io(e) => Some(e),
            AssetError::InvalidFileName(_) => None,
        }
    }
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        AssetError::Io(e)
    }
}

/// Failure loading configuration, mapping or fixture files
#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Toml(toml::de::Error),
    Mapping(quick_xml::de::DeError),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "failed to read '{}': {}", path, source),
            ConfigError::Toml(e) => write!(f, "invalid configuration: {}", e),
            ConfigError::Mapping(e) => write!(f, "invalid mapping file: {}", e),
            ConfigError::Json(e) => write!(f, "invalid JSON: {}", e),
            ConfigError::Csv(e) => write!(f, "invalid CSV: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml(e) => Some(e),
            ConfigError::Mapping(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Csv(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_local_errors() {
        let parse = FunctionError::Parse(ParseError::new(
            ParseErrorKind::MissingParenthesis,
            "expected '('",
            0,
            "HtmlEncode",
        ));
        assert!(parse.is_chain_local());

        let policy = FunctionError::Policy(PolicyViolation::MediaSourceMissing {
            web_part: "Media".into(),
        });
        assert!(!policy.is_chain_local());
    }

    #[test]
    fn test_display_messages() {
        let err = FunctionError::ArgumentCount {
            function: "Concatenate".into(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "function 'Concatenate' takes 2 parameter(s) but 1 were supplied"
        );

        let v = PolicyViolation::PageNotAvailableAtTarget {
            path: "/sites/a/Pages/home.aspx".into(),
        };
        assert!(v.to_string().contains("/sites/a/Pages/home.aspx"));
    }
}
