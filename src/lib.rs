//! ycg: layered YAML config generation
//!
//! Loads YAML documents, resolves their directives (`!include`, `!include:yaml`,
//! `!template`, `!include:template`, `!overwrite`, `!merge_by:<key>`) and deep-merges
//! them in order into one document.

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod merge;
pub mod render;
pub mod stack;
pub mod template;
pub mod value;

pub use error::{Error, Result};
pub use loader::{load, LoadOptions, Source};
pub use merge::merge;
pub use stack::{compose, Pipeline};
pub use template::{EnvLookup, TemplateContext};
pub use value::Node;
