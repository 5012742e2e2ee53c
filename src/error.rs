//! Error types for loading, merging and writing layered documents.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Directory not found: {}", .0.display())]
    OutputDirectoryNotFound(PathBuf),

    /// A directive payload had the wrong YAML shape.
    #[error("{directive} requires {expected} value, got {found} (in {source_name})")]
    DirectiveType {
        directive: String,
        expected: &'static str,
        found: &'static str,
        source_name: String,
    },

    #[error("unknown tag '{tag}' in {source_name}")]
    UnknownDirective { tag: String, source_name: String },

    #[error("template rendering failed in {source_name}: {source}")]
    TemplateRender {
        source_name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("include of {} exceeds recursion limit: {reason}", .path.display())]
    RecursionExhausted { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize result: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("data layers must produce a mapping, got {0}")]
    InvalidTemplateData(&'static str),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}
