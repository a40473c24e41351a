//! Parsed function invocations and their results

use std::collections::BTreeMap;

use super::coerce::ParamType;

/// Output name used when a selector is parsed without a property context
pub const SELECTOR_OUTPUT: &str = "SelectorResult";

/// One argument of a function call, or its output slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParameter {
    /// Placeholder name, or `Static_N` for literals
    pub name: String,
    pub param_type: ParamType,
    /// Raw value to coerce
    pub value: String,
    /// Written directly in the expression as a quoted literal
    pub is_static: bool,
}

impl FunctionParameter {
    pub fn placeholder(name: impl Into<String>) -> Self {
        FunctionParameter {
            name: name.into(),
            param_type: ParamType::String,
            value: String::new(),
            is_static: false,
        }
    }

    pub fn literal(index: usize, value: impl Into<String>) -> Self {
        FunctionParameter {
            name: format!("Static_{}", index),
            param_type: ParamType::String,
            value: value.into(),
            is_static: true,
        }
    }
}

/// A parsed function invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    /// Namespace prefix (`AddOn.Name(...)`); add-ons are no longer dispatched
    pub add_on: String,
    pub name: String,
    pub output: FunctionParameter,
    pub input: Vec<FunctionParameter>,
}

impl FunctionDefinition {
    /// `Name` or `AddOn.Name`
    pub fn qualified_name(&self) -> String {
        if self.add_on.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.add_on, self.name)
        }
    }
}

/// Value returned by a built-in function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOutput {
    /// Single value written to the output property
    Text(String),
    /// Single value written as `true`/`false`
    Bool(bool),
    /// One property per entry
    Map(BTreeMap<String, String>),
    /// Nothing to apply
    Nothing,
}

impl FunctionOutput {
    /// Build a map output from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        FunctionOutput::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Empty map, used as the fallback of lookup functions
    pub fn empty_map() -> Self {
        FunctionOutput::Map(BTreeMap::new())
    }

    /// Scalar text form, `None` for maps and nothing
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            FunctionOutput::Text(s) => Some(s.clone()),
            FunctionOutput::Bool(b) => Some(b.to_string()),
            FunctionOutput::Map(_) | FunctionOutput::Nothing => None,
        }
    }
}

impl From<String> for FunctionOutput {
    fn from(s: String) -> Self {
        FunctionOutput::Text(s)
    }
}

impl From<&str> for FunctionOutput {
    fn from(s: &str) -> Self {
        FunctionOutput::Text(s.to_string())
    }
}

impl From<bool> for FunctionOutput {
    fn from(b: bool) -> Self {
        FunctionOutput::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_forms() {
        assert_eq!(FunctionOutput::from("x").as_scalar(), Some("x".to_string()));
        assert_eq!(FunctionOutput::from(true).as_scalar(), Some("true".to_string()));
        assert_eq!(FunctionOutput::empty_map().as_scalar(), None);
        assert_eq!(FunctionOutput::Nothing.as_scalar(), None);
    }

    #[test]
    fn test_qualified_name() {
        let mut def = FunctionDefinition {
            add_on: String::new(),
            name: "HtmlEncode".into(),
            output: FunctionParameter::placeholder("Title"),
            input: vec![],
        };
        assert_eq!(def.qualified_name(), "HtmlEncode");
        def.add_on = "Custom".into();
        assert_eq!(def.qualified_name(), "Custom.HtmlEncode");
    }
}
