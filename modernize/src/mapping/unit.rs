//! Content units and their property bags

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kind of legacy web part a content unit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebPartKind {
    /// Classic server-side web part with a fixed property schema
    #[default]
    Classic,
    /// Client-side (script based) web part
    ClientSide,
    /// Add-in part hosted from another origin
    AddIn,
}

impl WebPartKind {
    /// Loosely typed parts tolerate placeholders the mapping does not declare
    pub fn is_loosely_typed(&self) -> bool {
        matches!(self, WebPartKind::ClientSide | WebPartKind::AddIn)
    }
}

/// Mutable string properties of one content unit.
///
/// Lookups are case-insensitive; an exact match wins over a case-folded one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    entries: HashMap<String, String>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.entries.get(name) {
            return Some(v);
        }
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the bag holds a property with this name
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert a property, overwriting an existing one with the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let existing = if self.entries.contains_key(&name) {
            Some(name.clone())
        } else {
            self.entries
                .keys()
                .find(|k| k.eq_ignore_ascii_case(&name))
                .cloned()
        };
        match existing {
            Some(key) => {
                self.entries.insert(key, value);
            }
            None => {
                self.entries.insert(name, value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over properties sorted by name
    pub fn iter_sorted(&self) -> Vec<(&str, &str)> {
        let mut items: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(b.0));
        items
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = PropertyBag::new();
        for (k, v) in iter {
            bag.set(k, v);
        }
        bag
    }
}

/// One web part or publishing field being transformed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Web part type name, matched against the mapping file
    pub type_name: String,
    #[serde(default)]
    pub kind: WebPartKind,
    #[serde(default)]
    pub properties: PropertyBag,
}

impl ContentUnit {
    pub fn new(type_name: impl Into<String>, kind: WebPartKind) -> Self {
        ContentUnit {
            type_name: type_name.into(),
            kind,
            properties: PropertyBag::new(),
        }
    }

    /// Builder-style property insert
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(name, value);
        self
    }
}
