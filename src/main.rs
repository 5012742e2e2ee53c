//! ycg: merge layered YAML configs with includes and templates

use anyhow::Result;

fn main() -> Result<()> {
    ycg::cli::run()
}
