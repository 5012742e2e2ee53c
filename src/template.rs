//! Template rendering for `!template` and `!include:template`.
//!
//! Templates are Jinja-style and rendered with `minijinja`. The variable namespace is
//! the merged data layers plus `--var` overrides, frozen before any config layer is
//! loaded. One name is reserved: `getenv(name, default="")` looks up an environment
//! variable through an [`EnvLookup`] capability.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use minijinja::Environment;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::value::value_kind;

/// Template variable name bound to the environment lookup function.
pub const RESERVED_GETENV: &str = "getenv";

type LookupFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Capability to read environment variables from templates.
#[derive(Clone)]
pub struct EnvLookup(Arc<LookupFn>);

impl EnvLookup {
    /// Read from the process environment.
    pub fn process() -> Self {
        Self(Arc::new(|name: &str| std::env::var(name).ok()))
    }

    /// Read from a fixed set of variables.
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self(Arc::new(move |name: &str| vars.get(name).cloned()))
    }

    /// Value of `name`, or `default` (empty when omitted) if it is unset.
    pub fn get(&self, name: &str, default: Option<&str>) -> String {
        (self.0)(name).unwrap_or_else(|| default.unwrap_or_default().to_string())
    }
}

impl fmt::Debug for EnvLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvLookup(..)")
    }
}

/// Frozen variables plus the engine used to render templates with them.
#[derive(Debug)]
pub struct TemplateContext {
    env: Environment<'static>,
    vars: minijinja::Value,
}

impl TemplateContext {
    /// Build the namespace from the merged data layers.
    ///
    /// `data` must be a mapping (null counts as empty). A data key named
    /// [`RESERVED_GETENV`] is shadowed by the lookup function, with a warning.
    pub fn new(data: &Value, lookup: EnvLookup) -> Result<Self> {
        let mut vars: BTreeMap<String, minijinja::Value> = BTreeMap::new();

        match data {
            Value::Null => {}
            Value::Mapping(mapping) => {
                for (key, value) in mapping {
                    match key_name(key) {
                        Some(name) => {
                            vars.insert(name, minijinja::Value::from_serialize(value));
                        }
                        None => tracing::debug!(
                            "skipping non-scalar data key of type {}",
                            value_kind(key)
                        ),
                    }
                }
            }
            other => return Err(Error::InvalidTemplateData(value_kind(other))),
        }

        if vars.contains_key(RESERVED_GETENV) {
            tracing::warn!(
                "you are trying to define a data key '{}' which is reserved",
                RESERVED_GETENV
            );
        }
        vars.insert(
            RESERVED_GETENV.to_string(),
            minijinja::Value::from_function(move |name: String, default: Option<String>| {
                lookup.get(&name, default.as_deref())
            }),
        );

        Ok(Self { env: Environment::new(), vars: minijinja::Value::from(vars) })
    }

    /// Render `template` against the frozen variables.
    pub fn render(&self, template: &str, source_name: &str) -> Result<String> {
        self.env.render_str(template, &self.vars).map_err(|source| Error::TemplateRender {
            source_name: source_name.to_string(),
            source,
        })
    }
}

fn key_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).expect("valid yaml")
    }

    fn lookup(pairs: &[(&str, &str)]) -> EnvLookup {
        EnvLookup::from_map(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_renders_data_variables() {
        let ctx = TemplateContext::new(&yaml("{name: web, ports: [80, 443]}"), lookup(&[]))
            .expect("context");
        let out = ctx
            .render("{{ name }}:{% for p in ports %}{{ p }},{% endfor %}", "test")
            .expect("render");
        assert_eq!(out, "web:80,443,");
    }

    #[test]
    fn test_getenv_with_and_without_default() {
        let ctx = TemplateContext::new(&Value::Null, lookup(&[("HOME_DIR", "/home/x")]))
            .expect("context");
        assert_eq!(ctx.render("{{ getenv('HOME_DIR') }}", "t").expect("render"), "/home/x");
        assert_eq!(ctx.render("[{{ getenv('NOPE') }}]", "t").expect("render"), "[]");
        assert_eq!(ctx.render("{{ getenv('NOPE', 'dflt') }}", "t").expect("render"), "dflt");
    }

    #[test]
    fn test_reserved_name_cannot_be_overridden() {
        let ctx = TemplateContext::new(&yaml("{getenv: shadowed}"), lookup(&[("X", "1")]))
            .expect("context");
        assert_eq!(ctx.render("{{ getenv('X') }}", "t").expect("render"), "1");
    }

    #[test]
    fn test_undefined_variable_renders_empty() {
        let ctx = TemplateContext::new(&yaml("{}"), lookup(&[])).expect("context");
        assert_eq!(ctx.render("a{{ missing }}b", "t").expect("render"), "ab");
    }

    #[test]
    fn test_trailing_newline_dropped() {
        let ctx = TemplateContext::new(&yaml("{v: 1}"), lookup(&[])).expect("context");
        assert_eq!(ctx.render("value={{ v }}\n", "t").expect("render"), "value=1");
    }

    #[test]
    fn test_syntax_error_is_render_error() {
        let ctx = TemplateContext::new(&yaml("{}"), lookup(&[])).expect("context");
        let err = ctx.render("{% if %}", "broken.yaml").expect_err("should fail");
        assert!(matches!(err, Error::TemplateRender { ref source_name, .. } if source_name == "broken.yaml"));
    }

    #[test]
    fn test_non_mapping_data_rejected() {
        let err = TemplateContext::new(&yaml("[1, 2]"), lookup(&[])).expect_err("should fail");
        assert!(matches!(err, Error::InvalidTemplateData("sequence")));
    }
}
