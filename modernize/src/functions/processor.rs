//! Runs the function chains of a mapping against one content unit

use crate::context::TransformationContext;
use crate::error::FunctionError;
use crate::mapping::{ContentUnit, PropertyDefinition, WebPartDefinition};

use super::definition::FunctionOutput;
use super::parser::{ParseScope, parse_function, split_chain};
use super::registry::FunctionRegistry;

/// A function expression that was abandoned together with the rest of its chain
#[derive(Debug)]
pub struct SkippedFunction {
    /// Property whose chain was running; `None` for selectors and free chains
    pub property: Option<String>,
    pub expression: String,
    pub error: FunctionError,
}

/// Result of processing one content unit
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    /// Value returned by the selector, if the mapping has one
    pub selector: Option<String>,
    pub skipped: Vec<SkippedFunction>,
}

/// Evaluates web part mappings with the general function library
#[derive(Debug, Clone, Copy)]
pub struct FunctionProcessor<'a> {
    registry: &'static FunctionRegistry,
    context: &'a TransformationContext,
}

impl<'a> FunctionProcessor<'a> {
    pub fn new(context: &'a TransformationContext) -> Self {
        Self::with_registry(FunctionRegistry::general(), context)
    }

    pub fn with_registry(registry: &'static FunctionRegistry, context: &'a TransformationContext) -> Self {
        FunctionProcessor { registry, context }
    }

    pub fn registry(&self) -> &'static FunctionRegistry {
        self.registry
    }

    /// Apply every property's function chain, then evaluate the selector.
    ///
    /// Properties produced along the way are declared on `definition`, so
    /// chains of later properties can reference them. Parse and argument
    /// errors abandon the current chain only and are reported in
    /// [`ProcessOutcome::skipped`]; policy violations abort the unit.
    pub fn process(
        &self,
        definition: &mut WebPartDefinition,
        unit: &mut ContentUnit,
    ) -> Result<ProcessOutcome, FunctionError> {
        let mut outcome = ProcessOutcome::default();

        // The property list grows while it is walked
        let mut index = 0;
        while index < definition.properties.len() {
            let property = &definition.properties[index];
            index += 1;
            let Some(chain) = property.function_chain().map(str::to_string) else {
                continue;
            };
            let name = property.name.clone();
            log::debug!("Processing functions of property '{}' on {}", name, unit.type_name);
            self.run_chain(&chain, Some(&name), definition, unit, &mut outcome)?;
        }

        if let Some(selector) = definition.selector().map(str::to_string) {
            let selected = self.run_selector(&selector, definition, unit, &mut outcome)?;
            outcome.selector = selected;
            log::debug!("Selector '{}' returned {:?}", selector, outcome.selector);
        }

        Ok(outcome)
    }

    /// Apply a function chain that is not attached to a property
    pub fn process_functions(
        &self,
        functions: &str,
        definition: &mut WebPartDefinition,
        unit: &mut ContentUnit,
    ) -> Result<ProcessOutcome, FunctionError> {
        let mut outcome = ProcessOutcome::default();
        self.run_chain(functions, None, definition, unit, &mut outcome)?;
        Ok(outcome)
    }

    fn run_chain(
        &self,
        chain: &str,
        property: Option<&str>,
        definition: &mut WebPartDefinition,
        unit: &mut ContentUnit,
        outcome: &mut ProcessOutcome,
    ) -> Result<(), FunctionError> {
        for expression in split_chain(chain) {
            let parsed = {
                let scope = ParseScope {
                    property,
                    declared: &definition.properties,
                    unit: &*unit,
                };
                parse_function(expression, &scope)
            };

            let result = parsed
                .map_err(FunctionError::from)
                .and_then(|parsed| {
                    self.registry
                        .dispatch(self.context, &parsed)
                        .map(|output| (parsed.output.name, output))
                });

            match result {
                Ok((output_name, output)) => merge(&output_name, output, definition, unit),
                Err(error) if error.is_chain_local() => {
                    log::warn!("Skipping '{}' and the rest of its chain: {}", expression, error);
                    outcome.skipped.push(SkippedFunction {
                        property: property.map(str::to_string),
                        expression: expression.to_string(),
                        error,
                    });
                    break;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    fn run_selector(
        &self,
        selector: &str,
        definition: &WebPartDefinition,
        unit: &ContentUnit,
        outcome: &mut ProcessOutcome,
    ) -> Result<Option<String>, FunctionError> {
        let scope = ParseScope {
            property: None,
            declared: &definition.properties,
            unit,
        };

        let result = parse_function(selector, &scope)
            .map_err(FunctionError::from)
            .and_then(|parsed| {
                let output = self.registry.dispatch(self.context, &parsed)?;
                match output {
                    FunctionOutput::Map(_) => Err(FunctionError::NonScalarSelector {
                        selector: parsed.name,
                    }),
                    other => Ok(other.as_scalar()),
                }
            });

        match result {
            Err(error) if error.is_chain_local() => {
                log::warn!("Skipping selector '{}': {}", selector, error);
                outcome.skipped.push(SkippedFunction {
                    property: None,
                    expression: selector.to_string(),
                    error,
                });
                Ok(None)
            }
            other => other,
        }
    }
}

/// Fold a function result into the bag and declare any new property
fn merge(output_name: &str, output: FunctionOutput, definition: &mut WebPartDefinition, unit: &mut ContentUnit) {
    match output {
        FunctionOutput::Text(value) => set_property(output_name, value, definition, unit),
        FunctionOutput::Bool(value) => set_property(output_name, value.to_string(), definition, unit),
        FunctionOutput::Map(values) => {
            for (name, value) in values {
                set_property(&name, value, definition, unit);
            }
        }
        FunctionOutput::Nothing => {}
    }
}

fn set_property(name: &str, value: String, definition: &mut WebPartDefinition, unit: &mut ContentUnit) {
    if definition.declare(name) {
        log::trace!("Declared produced property '{}'", name);
    }
    unit.properties.set(name, value);
}

/// Evaluates publishing page field mappings with the publishing library
#[derive(Debug, Clone, Copy)]
pub struct PublishingFunctionProcessor<'a> {
    context: &'a TransformationContext,
}

impl<'a> PublishingFunctionProcessor<'a> {
    pub fn new(context: &'a TransformationContext) -> Self {
        PublishingFunctionProcessor { context }
    }

    /// Run the function chain mapped onto one publishing field.
    ///
    /// Every field of the page is a valid placeholder. Map results are
    /// merged into the page's bag; the last text result is returned as
    /// `(output name, value)`.
    pub fn process_field(
        &self,
        field: &str,
        functions: &str,
        unit: &mut ContentUnit,
    ) -> Result<Option<(String, String)>, FunctionError> {
        let registry = FunctionRegistry::publishing();
        let mut last = None;

        for expression in split_chain(functions) {
            let declared: Vec<PropertyDefinition> = unit
                .properties
                .iter_sorted()
                .into_iter()
                .map(|(name, _)| PropertyDefinition::new(name, "string"))
                .collect();
            let scope = ParseScope {
                property: Some(field),
                declared: &declared,
                unit: &*unit,
            };

            let output = parse_function(expression, &scope)
                .map_err(FunctionError::from)
                .and_then(|parsed| {
                    registry
                        .dispatch(self.context, &parsed)
                        .map(|output| (parsed.output.name, output))
                });

            match output {
                Ok((name, FunctionOutput::Map(values))) => {
                    log::trace!("Field '{}' produced {} values through {}", field, values.len(), name);
                    for (key, value) in values {
                        unit.properties.set(key, value);
                    }
                }
                Ok((name, output)) => {
                    if let Some(value) = output.as_scalar() {
                        unit.properties.set(name.as_str(), value.as_str());
                        last = Some((name, value));
                    }
                }
                Err(error) if error.is_chain_local() => {
                    log::warn!("Skipping '{}' on field '{}': {}", expression, field, error);
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        Ok(last)
    }
}
