//! Output rendering: serialize the merged document and write it out.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tempfile::{Builder, NamedTempFile};

use crate::error::{Error, Result};
use crate::loader::STDIN_DESIGNATOR;

/// Output destination; `-` means stdout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Stdout,
    File(PathBuf),
}

impl From<&str> for Output {
    fn from(s: &str) -> Self {
        if s == STDIN_DESIGNATOR { Output::Stdout } else { Output::File(PathBuf::from(s)) }
    }
}

impl Output {
    /// Fail early if the destination directory does not exist.
    pub fn validate(&self) -> Result<()> {
        match self {
            Output::Stdout => Ok(()),
            Output::File(path) => {
                let parent = parent_dir(path);
                if parent.is_dir() {
                    Ok(())
                } else {
                    Err(Error::OutputDirectoryNotFound(parent))
                }
            }
        }
    }
}

/// Serialize to YAML, keeping mapping key order.
pub fn to_yaml(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(Error::Serialize)
}

/// Serialize `value` and write it to `output`.
///
/// Files are written through a temporary file in the same directory and renamed into
/// place, so a failed run never leaves a partial file behind. A new file gets the
/// usual `0o666` minus umask; an existing file keeps its permissions.
pub fn write_output(value: &Value, output: &Output) -> Result<()> {
    let rendered = to_yaml(value)?;
    match output {
        Output::Stdout => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .and_then(|_| handle.flush())
                .map_err(|e| Error::io("<stdout>", e))
        }
        Output::File(path) => {
            output.validate()?;
            let parent = parent_dir(path);
            let mut tmp = temp_file_in(&parent).map_err(|e| Error::io(&parent, e))?;
            tmp.write_all(rendered.as_bytes()).map_err(|e| Error::io(tmp.path(), e))?;
            if let Ok(existing) = fs::metadata(path) {
                fs::set_permissions(tmp.path(), existing.permissions())
                    .map_err(|e| Error::io(tmp.path(), e))?;
            }
            tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
            tracing::debug!(path = %path.display(), bytes = rendered.len(), "wrote output");
            Ok(())
        }
    }
}

fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Created through open(2), so the process umask applies.
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).expect("valid yaml")
    }

    #[test]
    fn test_to_yaml_preserves_key_order() {
        let out = to_yaml(&yaml("{zeta: 1, alpha: {b: 2, a: 1}}")).expect("yaml");
        assert_eq!(out, "zeta: 1\nalpha:\n  b: 2\n  a: 1\n");
    }

    #[test]
    fn test_output_designator() {
        assert_eq!(Output::from("-"), Output::Stdout);
        assert_eq!(
            Output::from("out.yaml"),
            Output::File(PathBuf::from("out.yaml"))
        );
    }

    #[test]
    fn test_write_output_to_file() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("result.yaml");
        write_output(&yaml("{a: [1, 2]}"), &Output::File(path.clone())).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "a:\n- 1\n- 2\n");
    }

    #[test]
    fn test_missing_output_directory() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("missing").join("result.yaml");
        let err = write_output(&yaml("{a: 1}"), &Output::File(path)).expect_err("should fail");
        assert!(matches!(err, Error::OutputDirectoryNotFound(ref dir) if dir.ends_with("missing")));
    }

    #[test]
    fn test_bare_file_name_validates_against_cwd() {
        assert!(Output::File(PathBuf::from("result.yaml")).validate().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_new_output_file_follows_umask() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tmp");
        // A plain create in the same directory shows what the umask allows.
        let reference = tmp.path().join("reference.yaml");
        fs::write(&reference, "").expect("write reference");
        let expected = fs::metadata(&reference).expect("meta").permissions().mode() & 0o777;

        let path = tmp.path().join("result.yaml");
        write_output(&yaml("{a: 1}"), &Output::File(path.clone())).expect("write");
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_output_file_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("result.yaml");
        fs::write(&path, "old: true\n").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");

        write_output(&yaml("{a: 1}"), &Output::File(path.clone())).expect("write");
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(fs::read_to_string(&path).expect("read"), "a: 1\n");
    }
}
