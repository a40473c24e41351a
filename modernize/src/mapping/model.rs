//! Declarative web part mapping definitions

use serde::{Deserialize, Serialize};

use crate::functions::ParamType;

/// A property a web part mapping declares, with the functions attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    /// Declared type name (`string`, `integer`, `bool`, `guid`, `datetime`)
    #[serde(default = "default_type_name")]
    pub type_name: String,
    /// `;`-delimited function expressions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<String>,
}

fn default_type_name() -> String {
    "string".to_string()
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        PropertyDefinition {
            name: name.into(),
            type_name: type_name.into(),
            functions: None,
        }
    }

    pub fn with_functions(mut self, functions: impl Into<String>) -> Self {
        self.functions = Some(functions.into());
        self
    }

    /// Parameter type this property binds to
    pub fn param_type(&self) -> ParamType {
        ParamType::from_name(&self.type_name)
    }

    /// The attached function chain, if it is not blank
    pub fn function_chain(&self) -> Option<&str> {
        self.functions
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// One target variant a selector can pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingVariant {
    pub name: String,
    #[serde(default)]
    pub default: bool,
    /// Functions that run when this variant is chosen, not tied to one property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<String>,
}

/// Selector expression plus the variants it chooses between
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default)]
    pub mappings: Vec<MappingVariant>,
}

/// Mapping definition for one legacy web part type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPartDefinition {
    pub type_name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<MappingSet>,
}

impl WebPartDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        WebPartDefinition {
            type_name: type_name.into(),
            properties: Vec::new(),
            mappings: None,
        }
    }

    pub fn with_property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.mappings
            .get_or_insert_with(MappingSet::default)
            .selector = Some(selector.into());
        self
    }

    pub fn with_mapping(mut self, variant: MappingVariant) -> Self {
        self.mappings
            .get_or_insert_with(MappingSet::default)
            .mappings
            .push(variant);
        self
    }

    /// Find a declared property (case-insensitive)
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Declare a string property produced at runtime.
    ///
    /// Returns true when the property was not declared before.
    pub fn declare(&mut self, name: &str) -> bool {
        if self.property(name).is_some() {
            return false;
        }
        self.properties.push(PropertyDefinition::new(name, "string"));
        true
    }

    /// The selector expression, if one is set
    pub fn selector(&self) -> Option<&str> {
        self.mappings
            .as_ref()
            .and_then(|m| m.selector.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Pick the variant named by a selector result, falling back to the default variant
    pub fn select_mapping(&self, selector_result: Option<&str>) -> Option<&MappingVariant> {
        let set = self.mappings.as_ref()?;
        if let Some(name) = selector_result {
            if let Some(found) = set
                .mappings
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(name))
            {
                return Some(found);
            }
        }
        set.mappings
            .iter()
            .find(|m| m.default)
            .or_else(|| set.mappings.first())
    }

    /// Whether this definition applies to a (possibly assembly-qualified) type name
    pub fn matches_type(&self, type_name: &str) -> bool {
        short_type_name(&self.type_name).eq_ignore_ascii_case(short_type_name(type_name))
    }
}

/// `Namespace.Type, Assembly, Version=...` -> `Namespace.Type`
fn short_type_name(type_name: &str) -> &str {
    type_name.split(',').next().unwrap_or(type_name).trim()
}
