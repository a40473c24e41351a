//! Mapping-driven transformation of classic pages into modern pages.
//!
//! A [`mapping::MappingFile`] describes, per legacy web part type, which
//! properties exist and which function chains turn them into properties of
//! the modern page. [`functions::FunctionProcessor`] evaluates those chains
//! against a [`mapping::ContentUnit`] using lookups from a
//! [`source::SourceContext`].

pub mod config;
pub mod context;
pub mod error;
pub mod functions;
pub mod html;
pub mod mapping;
pub mod source;
pub mod xml;

pub use config::{Config, TransformSettings};
pub use context::TransformationContext;
pub use error::{ConfigError, FunctionError, ParseError, PolicyViolation};
pub use functions::{FunctionProcessor, FunctionRegistry, ProcessOutcome, PublishingFunctionProcessor};
