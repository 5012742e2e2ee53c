//! Command-line interface for ycg
//!
//! `ycg [OPTIONS] <FILE>...` merges the config layers in order, rendering templates
//! with variables taken from the data layers and `--var` overrides.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliOverrides, Settings, ENV_BASEDIR, ENV_MAX_INCLUDE_DEPTH};
use crate::render::{write_output, Output};

mod utils;

use utils::{parse_sources, parse_vars};

/// YAML config generator: merge layered YAML files with includes and templates
#[derive(Parser, Debug)]
#[command(name = "ycg")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Input files, merged in order (use '-' for stdin)
    #[arg(value_name = "FILE", required_unless_present = "version")]
    inputs: Vec<String>,

    /// Output to this file (default is stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Data files whose merged content becomes template variables (repeatable, '-' for stdin)
    #[arg(short, long = "data", value_name = "FILE")]
    data: Vec<String>,

    /// Add a variable that can be used in templates (repeatable)
    #[arg(short = 'V', long = "var", num_args = 2, value_names = ["KEY", "VALUE"])]
    vars: Vec<String>,

    /// Base directory for resolving paths in stdin input (ignored for files, defaults to
    /// the current working directory)
    #[arg(short, long, value_name = "DIR", env = ENV_BASEDIR)]
    basedir: Option<PathBuf>,

    /// Maximum depth of nested !include:yaml chains
    #[arg(long, value_name = "N", env = ENV_MAX_INCLUDE_DEPTH)]
    max_include_depth: Option<usize>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print version
    #[arg(long)]
    version: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if cli.version {
        println!("ycg {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    generate(cli)
}

fn generate(cli: Cli) -> Result<()> {
    let output = cli.output.as_deref().map(Output::from);
    if let Some(output) = &output {
        output.validate()?;
    }

    let config_layers = parse_sources(&cli.inputs)?;
    let data_layers = parse_sources(&cli.data)?;

    let settings = Settings::resolve(CliOverrides {
        base_dir: cli.basedir,
        max_include_depth: cli.max_include_depth,
        output,
    })?;

    let mut pipeline = settings.pipeline(config_layers);
    pipeline.data_layers = data_layers;
    pipeline.vars = parse_vars(&cli.vars);

    let result = pipeline.run().context("Failed to generate config")?;
    write_output(&result, &settings.output)?;
    Ok(())
}
