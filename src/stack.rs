//! Layer stack: load sources in order and fold them into one document.
//!
//! The full pipeline is two stacks. Data layers are composed without templating; their
//! result (plus `--var` overrides) becomes the frozen template namespace for the
//! config layers, which are composed with templating enabled.

use serde_yaml::{Mapping, Value};

use crate::error::Result;
use crate::loader::{load, LoadOptions, Source};
use crate::merge::merge_all;
use crate::template::{EnvLookup, TemplateContext};

/// Load each source, then merge the layers in order onto an empty mapping.
///
/// Stdin is read once each time it appears in `sources`.
pub fn compose(sources: &[Source], options: &LoadOptions<'_>) -> Result<Value> {
    let layers = sources
        .iter()
        .map(|source| {
            tracing::debug!(
                source = %source,
                templating = options.templating_enabled(),
                "loading layer"
            );
            load(source, options)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_all(layers))
}

/// Everything needed to produce one merged config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub config_layers: Vec<Source>,
    pub data_layers: Vec<Source>,
    /// Top-level template variables applied after the data layers, in order.
    pub vars: Vec<(String, String)>,
    pub base_dir: std::path::PathBuf,
    pub max_include_depth: usize,
    pub env: EnvLookup,
}

impl Pipeline {
    pub fn new(config_layers: Vec<Source>, base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            config_layers,
            data_layers: Vec::new(),
            vars: Vec::new(),
            base_dir: base_dir.into(),
            max_include_depth: crate::loader::DEFAULT_MAX_INCLUDE_DEPTH,
            env: EnvLookup::process(),
        }
    }

    /// Compose the data layers and apply variable overrides.
    pub fn template_data(&self) -> Result<Value> {
        let options = self.load_options();
        let mut data = compose(&self.data_layers, &options)?;

        if !self.vars.is_empty() {
            if data.is_null() {
                data = Value::Mapping(Mapping::new());
            }
            if let Value::Mapping(mapping) = &mut data {
                for (key, value) in &self.vars {
                    mapping.insert(Value::String(key.clone()), Value::String(value.clone()));
                }
            }
        }
        Ok(data)
    }

    /// Run both stacks and return the merged config.
    pub fn run(&self) -> Result<Value> {
        let data = self.template_data()?;
        let templates = TemplateContext::new(&data, self.env.clone())?;
        let options = self.load_options().with_templates(&templates);
        compose(&self.config_layers, &options)
    }

    fn load_options<'a>(&self) -> LoadOptions<'a> {
        LoadOptions::new(self.base_dir.clone()).max_include_depth(self.max_include_depth)
    }
}
