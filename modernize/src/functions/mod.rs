//! The mapping function engine
//!
//! Expressions attached to mapping properties are parsed ([`parser`]),
//! their arguments coerced ([`coerce`]) and dispatched by name to the
//! built-in libraries ([`registry`]). [`processor`] drives this for a whole
//! content unit.

pub mod coerce;
pub mod definition;
pub mod docs;
pub mod library;
pub mod parser;
pub mod processor;
pub mod registry;

pub use coerce::{Arg, Args, ParamType};
pub use definition::{FunctionDefinition, FunctionOutput, FunctionParameter, SELECTOR_OUTPUT};
pub use parser::{ParseScope, parse_function, split_chain};
pub use processor::{FunctionProcessor, ProcessOutcome, PublishingFunctionProcessor, SkippedFunction};
pub use registry::{BuiltinFunction, FunctionKind, FunctionRegistry, FunctionResult, Library};
