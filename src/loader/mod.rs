//! Document loading with directive resolution
//!
//! A source is parsed as YAML and every tagged node is handed to the directive
//! registry, which expands includes and templates and turns `!overwrite` /
//! `!merge_by:<key>` into [`Node`] annotations. Nested `!include:yaml` documents are
//! loaded by the same loader, so the include chain is tracked for cycle detection.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_yaml::value::TaggedValue;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::template::TemplateContext;
use crate::value::Node;

pub mod directives;

pub use directives::DirectiveRegistry;

/// Include chains deeper than this fail with `RecursionExhausted`.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// Designator for standard input on the command line.
pub const STDIN_DESIGNATOR: &str = "-";

/// Where a layer comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    pub fn name(&self) -> String {
        match self {
            Source::Stdin => "<stdin>".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        if s == STDIN_DESIGNATOR { Source::Stdin } else { Source::File(PathBuf::from(s)) }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Loader-wide settings shared by every nested include.
#[derive(Debug, Clone)]
pub struct LoadOptions<'a> {
    /// Directory for resolving includes in stream (stdin) sources.
    pub base_dir: PathBuf,
    /// Variables for `!template` directives; `None` disables templating.
    pub templates: Option<&'a TemplateContext>,
    pub max_include_depth: usize,
}

impl<'a> LoadOptions<'a> {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), templates: None, max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH }
    }

    pub fn with_templates(mut self, templates: &'a TemplateContext) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn templating_enabled(&self) -> bool {
        self.templates.is_some()
    }
}

/// Load one source into a resolved [`Node`] tree.
pub fn load(source: &Source, options: &LoadOptions<'_>) -> Result<Node> {
    let registry = DirectiveRegistry::new(options.templating_enabled());
    Loader::new(&registry, options).load_source(source)
}

/// Load YAML text as a stream source: relative includes resolve against `base_dir`.
pub fn load_str(text: &str, options: &LoadOptions<'_>) -> Result<Node> {
    let registry = DirectiveRegistry::new(options.templating_enabled());
    let doc = DocContext { dir: options.base_dir.clone(), name: "<string>".to_string() };
    Loader::new(&registry, options).load_text(text, &doc)
}

/// The document currently being resolved.
#[derive(Debug, Clone)]
pub struct DocContext {
    /// Directory that relative include paths resolve against.
    pub dir: PathBuf,
    pub name: String,
}

impl DocContext {
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.dir.join(relative)
    }
}

pub(crate) struct Loader<'a> {
    registry: &'a DirectiveRegistry,
    options: &'a LoadOptions<'a>,
    /// Canonical paths of the files currently being loaded, outermost first.
    chain: Vec<PathBuf>,
}

impl<'a> Loader<'a> {
    fn new(registry: &'a DirectiveRegistry, options: &'a LoadOptions<'a>) -> Self {
        Self { registry, options, chain: Vec::new() }
    }

    pub(crate) fn templates(&self) -> Option<&'a TemplateContext> {
        self.options.templates
    }

    pub(crate) fn load_source(&mut self, source: &Source) -> Result<Node> {
        match source {
            Source::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|e| Error::io("<stdin>", e))?;
                let doc = DocContext { dir: self.options.base_dir.clone(), name: source.name() };
                self.load_text(&text, &doc)
            }
            Source::File(path) => self.load_file(path),
        }
    }

    fn load_file(&mut self, path: &Path) -> Result<Node> {
        let canonical = fs::canonicalize(path).map_err(|e| not_found_or_io(path, e))?;

        if self.chain.contains(&canonical) {
            let mut cycle: Vec<String> = self.chain.iter().map(|p| p.display().to_string()).collect();
            cycle.push(canonical.display().to_string());
            return Err(Error::RecursionExhausted {
                path: path.to_path_buf(),
                reason: format!("include cycle {}", cycle.join(" -> ")),
            });
        }
        if self.chain.len() >= self.options.max_include_depth {
            return Err(Error::RecursionExhausted {
                path: path.to_path_buf(),
                reason: format!("include depth exceeds {}", self.options.max_include_depth),
            });
        }

        tracing::debug!(path = %path.display(), depth = self.chain.len(), "loading document");
        let text = read_text(path)?;
        let dir = canonical.parent().map(Path::to_path_buf).unwrap_or_else(|| self.options.base_dir.clone());
        let doc = DocContext { dir, name: path.display().to_string() };

        self.chain.push(canonical);
        let result = self.load_text(&text, &doc);
        self.chain.pop();
        result
    }

    fn load_text(&mut self, text: &str, doc: &DocContext) -> Result<Node> {
        let value = parse_document(text, &doc.name)?;
        self.resolve(value, doc)
    }

    /// Resolve every directive in `value`.
    pub(crate) fn resolve(&mut self, value: Value, doc: &DocContext) -> Result<Node> {
        match value {
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let tag = tag.to_string();
                let registry = self.registry;
                match registry.lookup(&tag) {
                    Some((handler, param)) => handler(self, &tag, param, value, doc),
                    None => Err(Error::UnknownDirective { tag, source_name: doc.name.clone() }),
                }
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve(item, doc))
                .collect::<Result<Vec<_>>>()
                .map(Node::Sequence),
            Value::Mapping(mapping) => {
                let mut entries = indexmap::IndexMap::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let node = self.resolve(value, doc)?;
                    entries.insert(key, node);
                }
                Ok(Node::Mapping(entries))
            }
            scalar => Ok(Node::Scalar(scalar)),
        }
    }
}

/// Parse a single YAML document and expand merge keys; blank or comment-only text is null.
pub fn parse_document(text: &str, source_name: &str) -> Result<Value> {
    let blank = text.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Ok(Value::Null);
    }
    let parse_error = |source| Error::Parse { source_name: source_name.to_string(), source };
    let mut value: Value = serde_yaml::from_str(text).map_err(parse_error)?;
    // `<<: *anchor` merge keys
    value.apply_merge().map_err(parse_error)?;
    Ok(value)
}

/// Read a whole file as text, mapping a missing file to `SourceNotFound`.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| not_found_or_io(path, e))
}

fn not_found_or_io(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::SourceNotFound(path.to_path_buf())
    } else {
        Error::io(path, err)
    }
}
