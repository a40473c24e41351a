//! Built-in function catalogs

mod assets;
mod lists;
mod people;
mod publishing;
mod rollup;
mod selectors;
mod text;

pub use assets::transfer_asset;
pub use people::{PersonInfo, resolve_person};
pub use publishing::{KEEP_EXISTING_VALUE, term_token};
pub use rollup::RollupChannels;

use super::coerce::ParamType;
use super::registry::{BuiltinFunction, ParamDoc};

/// Shorthand for parameter documentation in the catalog tables
const fn param(name: &'static str, param_type: ParamType, description: &'static str) -> ParamDoc {
    ParamDoc {
        name,
        param_type,
        description,
    }
}

/// Catalog used for web part mappings
pub(crate) fn general_functions() -> Vec<BuiltinFunction> {
    [
        text::FUNCTIONS,
        assets::FUNCTIONS,
        lists::FUNCTIONS,
        people::FUNCTIONS,
        rollup::FUNCTIONS,
        selectors::FUNCTIONS,
    ]
    .concat()
}

/// Catalog used for publishing page fields
pub(crate) fn publishing_functions() -> Vec<BuiltinFunction> {
    publishing::FUNCTIONS.to_vec()
}

/// General helpers the publishing catalog exposes under the same names
pub(crate) fn publishing_shared_functions() -> Vec<BuiltinFunction> {
    text::FUNCTIONS
        .iter()
        .filter(|f| matches!(f.name, "EmptyString" | "StaticString"))
        .copied()
        .collect()
}
