//! Directive registry
//!
//! Maps YAML tags to handlers. Exact tags (`!include`, `!overwrite`, ...) are looked
//! up by name; parameterized tags (`!merge_by:<key>`) by prefix, with the remainder
//! passed to the handler. The registry is built once per load call, and the template
//! directives are only registered when templating is enabled.

use std::collections::HashMap;

use serde_yaml::Value;

use super::{read_text, DocContext, Loader, Source};
use crate::error::{Error, Result};
use crate::value::{value_kind, Node};

pub const INCLUDE: &str = "include";
pub const INCLUDE_YAML: &str = "include:yaml";
pub const TEMPLATE: &str = "template";
pub const INCLUDE_TEMPLATE: &str = "include:template";
pub const OVERWRITE: &str = "overwrite";
pub const MERGE_BY_PREFIX: &str = "merge_by:";

/// Resolves one tagged node: `(loader, full tag, parameter, payload, document)`.
pub(crate) type Handler =
    fn(&mut Loader<'_>, &str, Option<&str>, Value, &DocContext) -> Result<Node>;

pub struct DirectiveRegistry {
    exact: HashMap<&'static str, Handler>,
    prefixed: Vec<(&'static str, Handler)>,
}

impl DirectiveRegistry {
    pub fn new(templating: bool) -> Self {
        let mut exact: HashMap<&'static str, Handler> = HashMap::new();
        exact.insert(INCLUDE, include);
        exact.insert(INCLUDE_YAML, include_yaml);
        exact.insert(OVERWRITE, overwrite);
        if templating {
            exact.insert(TEMPLATE, template);
            exact.insert(INCLUDE_TEMPLATE, include_template);
        }

        let merge_by_handler: Handler = merge_by;

        Self { exact, prefixed: vec![(MERGE_BY_PREFIX, merge_by_handler)] }
    }

    /// Find the handler for `tag`, with the prefix parameter if any.
    pub(crate) fn lookup<'t>(&self, tag: &'t str) -> Option<(Handler, Option<&'t str>)> {
        let name = tag.strip_prefix('!').unwrap_or(tag);
        if let Some(handler) = self.exact.get(name) {
            return Some((*handler, None));
        }
        self.prefixed.iter().find_map(|(prefix, handler)| {
            name.strip_prefix(prefix)
                .filter(|param| !param.is_empty())
                .map(|param| (*handler, Some(param)))
        })
    }

    /// Whether `tag` would be recognized.
    pub fn recognizes(&self, tag: &str) -> bool {
        self.lookup(tag).is_some()
    }
}

impl std::fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.exact.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("DirectiveRegistry")
            .field("exact", &names)
            .field("prefixed", &self.prefixed.iter().map(|(p, _)| *p).collect::<Vec<_>>())
            .finish()
    }
}

/// Path and template payloads are scalar text; `!include 5` names the file `5`.
fn expect_string(tag: &str, payload: Value, doc: &DocContext) -> Result<String> {
    match payload {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::DirectiveType {
            directive: tag.to_string(),
            expected: "a string",
            found: value_kind(&other),
            source_name: doc.name.clone(),
        }),
    }
}

fn include(
    _loader: &mut Loader<'_>,
    tag: &str,
    _param: Option<&str>,
    payload: Value,
    doc: &DocContext,
) -> Result<Node> {
    let relative = expect_string(tag, payload, doc)?;
    let path = doc.resolve_path(&relative);
    tracing::debug!(path = %path.display(), "including raw text");
    Ok(Node::Scalar(Value::String(read_text(&path)?)))
}

fn include_yaml(
    loader: &mut Loader<'_>,
    tag: &str,
    _param: Option<&str>,
    payload: Value,
    doc: &DocContext,
) -> Result<Node> {
    let relative = expect_string(tag, payload, doc)?;
    loader.load_source(&Source::File(doc.resolve_path(&relative)))
}

fn template(
    loader: &mut Loader<'_>,
    tag: &str,
    _param: Option<&str>,
    payload: Value,
    doc: &DocContext,
) -> Result<Node> {
    let Some(templates) = loader.templates() else {
        return Err(Error::UnknownDirective { tag: tag.to_string(), source_name: doc.name.clone() });
    };
    let source = expect_string(tag, payload, doc)?;
    Ok(Node::Scalar(Value::String(templates.render(&source, &doc.name)?)))
}

fn include_template(
    loader: &mut Loader<'_>,
    tag: &str,
    _param: Option<&str>,
    payload: Value,
    doc: &DocContext,
) -> Result<Node> {
    let Some(templates) = loader.templates() else {
        return Err(Error::UnknownDirective { tag: tag.to_string(), source_name: doc.name.clone() });
    };
    let relative = expect_string(tag, payload, doc)?;
    let path = doc.resolve_path(&relative);
    tracing::debug!(path = %path.display(), "rendering template file");
    let text = read_text(&path)?;
    Ok(Node::Scalar(Value::String(templates.render(&text, &path.display().to_string())?)))
}

fn overwrite(
    loader: &mut Loader<'_>,
    _tag: &str,
    _param: Option<&str>,
    payload: Value,
    doc: &DocContext,
) -> Result<Node> {
    Ok(Node::overwrite(loader.resolve(payload, doc)?))
}

fn merge_by(
    loader: &mut Loader<'_>,
    tag: &str,
    param: Option<&str>,
    payload: Value,
    doc: &DocContext,
) -> Result<Node> {
    let key = param.unwrap_or_default();
    match payload {
        Value::Sequence(items) => {
            let items = items
                .into_iter()
                .map(|item| loader.resolve(item, doc))
                .collect::<Result<Vec<_>>>()?;
            Ok(Node::merge_by(key, items))
        }
        other => Err(Error::DirectiveType {
            directive: tag.to_string(),
            expected: "a sequence",
            found: value_kind(&other),
            source_name: doc.name.clone(),
        }),
    }
}
