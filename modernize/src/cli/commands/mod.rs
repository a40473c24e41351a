//! Subcommand handlers

pub mod docs;
pub mod parse;
pub mod run;
