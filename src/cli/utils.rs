//! Shared CLI utilities.

use std::path::Path;

use crate::error::Error;
use crate::loader::Source;

/// Turn source designators into [`Source`]s, failing on the first file that does
/// not exist. `-` is stdin and is never checked.
pub fn parse_sources(values: &[String]) -> Result<Vec<Source>, Error> {
    values
        .iter()
        .map(|value| {
            let source = Source::from(value.as_str());
            if let Source::File(path) = &source {
                if !Path::new(path).exists() {
                    return Err(Error::SourceNotFound(absolute(path)));
                }
            }
            Ok(source)
        })
        .collect()
}

/// Pair up the flat `KEY VALUE KEY VALUE ...` list collected by `--var`.
pub fn parse_vars(values: &[String]) -> Vec<(String, String)> {
    values
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

fn absolute(path: &Path) -> std::path::PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
