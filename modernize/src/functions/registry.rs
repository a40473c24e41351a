//! Name to handler tables for the two built-in function libraries

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::coerce::{Args, ParamType, coerce};
use super::definition::{FunctionDefinition, FunctionOutput};
use super::library;
use crate::context::TransformationContext;
use crate::error::FunctionError;

pub type FunctionResult = Result<FunctionOutput, FunctionError>;

/// A built-in function body
pub type Handler = fn(&TransformationContext, &Args) -> FunctionResult;

/// Which catalog a function belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    General,
    Publishing,
}

impl std::fmt::Display for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Library::General => write!(f, "general"),
            Library::Publishing => write!(f, "publishing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// Produces property values
    Function,
    /// Picks a mapping variant
    Selector,
}

/// Documentation of one parameter
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamDoc {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: &'static str,
}

/// Documentation attached to a built-in function; inert at runtime
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FunctionDoc {
    pub description: &'static str,
    pub example: &'static str,
    pub params: &'static [ParamDoc],
    pub returns: &'static str,
}

/// One entry of a library table
#[derive(Clone, Copy)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub doc: FunctionDoc,
    pub handler: Handler,
}

impl BuiltinFunction {
    pub fn arity(&self) -> usize {
        self.doc.params.len()
    }
}

impl std::fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arity", &self.arity())
            .finish()
    }
}

/// Resolves parsed function names to handlers
#[derive(Debug)]
pub struct FunctionRegistry {
    library: Library,
    functions: HashMap<&'static str, BuiltinFunction>,
}

static GENERAL: Lazy<FunctionRegistry> =
    Lazy::new(|| FunctionRegistry::build(Library::General, &[library::general_functions()]));

static PUBLISHING: Lazy<FunctionRegistry> = Lazy::new(|| {
    FunctionRegistry::build(
        Library::Publishing,
        &[library::publishing_functions(), library::publishing_shared_functions()],
    )
});

impl FunctionRegistry {
    fn build(library: Library, tables: &[Vec<BuiltinFunction>]) -> Self {
        let mut functions = HashMap::new();
        for function in tables.iter().flatten() {
            if functions.insert(function.name, *function).is_some() {
                log::warn!("Function '{}' registered twice in the {} library", function.name, library);
            }
        }
        log::debug!("Built {} library with {} functions", library, functions.len());
        FunctionRegistry { library, functions }
    }

    /// Functions and selectors for ordinary web part mappings
    pub fn general() -> &'static FunctionRegistry {
        &GENERAL
    }

    /// Functions for publishing page field mappings
    pub fn publishing() -> &'static FunctionRegistry {
        &PUBLISHING
    }

    pub fn library(&self) -> Library {
        self.library
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&BuiltinFunction> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// All entries ordered by kind, then name
    pub fn entries(&self) -> Vec<&BuiltinFunction> {
        let mut entries: Vec<_> = self.functions.values().collect();
        entries.sort_by(|a, b| {
            (a.kind == FunctionKind::Selector, a.name).cmp(&(b.kind == FunctionKind::Selector, b.name))
        });
        entries
    }

    /// Invoke a parsed definition.
    ///
    /// Unknown names and add-on functions yield [`FunctionOutput::Nothing`].
    /// Errors raised by the function itself are returned unchanged.
    pub fn dispatch(&self, context: &TransformationContext, definition: &FunctionDefinition) -> FunctionResult {
        if !definition.add_on.is_empty() {
            log::warn!(
                "Add-on function '{}' is not supported, skipping",
                definition.qualified_name()
            );
            return Ok(FunctionOutput::Nothing);
        }

        let Some(function) = self.get(&definition.name) else {
            log::debug!("No {} function named '{}'", self.library, definition.name);
            return Ok(FunctionOutput::Nothing);
        };

        let args = if function.arity() == 0 {
            Args::default()
        } else if definition.input.len() != function.arity() {
            return Err(FunctionError::ArgumentCount {
                function: definition.name.clone(),
                expected: function.arity(),
                actual: definition.input.len(),
            });
        } else {
            coerce(&definition.input)
        };

        log::trace!("Dispatching {}({} args)", definition.name, args.len());
        (function.handler)(context, &args)
    }
}
