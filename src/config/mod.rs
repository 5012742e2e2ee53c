//! Run settings
//!
//! Resolved with the precedence CLI > Env > Defaults. Environment fallbacks
//! (`YCG_BASEDIR`, `YCG_MAX_INCLUDE_DEPTH`) are read by clap, so by the time values
//! reach [`Settings::resolve`] only the defaults remain to be filled in.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::loader::{Source, DEFAULT_MAX_INCLUDE_DEPTH};
use crate::render::Output;
use crate::stack::Pipeline;

pub const ENV_BASEDIR: &str = "YCG_BASEDIR";
pub const ENV_MAX_INCLUDE_DEPTH: &str = "YCG_MAX_INCLUDE_DEPTH";

/// Values supplied on the command line (or via their environment fallbacks).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_dir: Option<PathBuf>,
    pub max_include_depth: Option<usize>,
    pub output: Option<Output>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory that includes in stdin sources resolve against.
    pub base_dir: PathBuf,
    pub max_include_depth: usize,
    pub output: Output,
}

impl Settings {
    pub fn resolve(overrides: CliOverrides) -> Result<Self> {
        let base_dir = match overrides.base_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        if !base_dir.is_dir() {
            anyhow::bail!("Base directory not found: {}", base_dir.display());
        }

        let max_include_depth = overrides.max_include_depth.unwrap_or(DEFAULT_MAX_INCLUDE_DEPTH);
        if max_include_depth == 0 {
            anyhow::bail!("--max-include-depth must be at least 1");
        }

        Ok(Self { base_dir, max_include_depth, output: overrides.output.unwrap_or_default() })
    }

    /// A pipeline over `config_layers` using these settings.
    pub fn pipeline(&self, config_layers: Vec<Source>) -> Pipeline {
        let mut pipeline = Pipeline::new(config_layers, self.base_dir.clone());
        pipeline.max_include_depth = self.max_include_depth;
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(CliOverrides::default()).expect("settings");
        assert_eq!(settings.base_dir, std::env::current_dir().expect("cwd"));
        assert_eq!(settings.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
        assert_eq!(settings.output, Output::Stdout);
    }

    #[test]
    fn test_overrides_win() {
        let tmp = TempDir::new().expect("tmp");
        let settings = Settings::resolve(CliOverrides {
            base_dir: Some(tmp.path().to_path_buf()),
            max_include_depth: Some(3),
            output: Some(Output::File(tmp.path().join("out.yaml"))),
        })
        .expect("settings");
        assert_eq!(settings.base_dir, tmp.path());
        let pipeline = settings.pipeline(vec![Source::Stdin]);
        assert_eq!(pipeline.max_include_depth, 3);
        assert_eq!(pipeline.base_dir, tmp.path());
        assert!(pipeline.data_layers.is_empty());
    }

    #[test]
    fn test_missing_base_dir_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let result = Settings::resolve(CliOverrides {
            base_dir: Some(tmp.path().join("nope")),
            ..CliOverrides::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let result = Settings::resolve(CliOverrides {
            max_include_depth: Some(0),
            ..CliOverrides::default()
        });
        assert!(result.is_err());
    }
}
