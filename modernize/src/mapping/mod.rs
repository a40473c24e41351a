//! Mapping definitions and the content units they apply to

mod file;
mod model;
mod unit;

pub use file::MappingFile;
pub use model::{MappingSet, MappingVariant, PropertyDefinition, WebPartDefinition};
pub use unit::{ContentUnit, PropertyBag, WebPartKind};
