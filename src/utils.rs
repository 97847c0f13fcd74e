//! Utility methods.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{ConfigError, Result};

/// The directory `path` lives in, `.` for a bare file name.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Create the parent directory of `path` if it doesn't exist yet.
pub fn create_parent_dir(path: &Path) -> Result<()> {
    let dir = parent_dir(path);
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;
        log::info!("created directory {}", dir.display());
    }
    Ok(())
}

/// Write `contents` to `path` through a temporary file in the same
/// directory, renamed over `path` once fully written. Readers never see a
/// half-written document.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    create_parent_dir(path)?;
    let dir = parent_dir(path);

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
    if let Err(e) = tmp.write_all(contents).and_then(|_| tmp.flush()) {
        return Err(ConfigError::io(tmp.path(), e));
    }
    tmp.persist(path).map_err(|e| ConfigError::io(path, e.error))?;
    Ok(())
}

/// Lower-case extension of `path`, if any.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_bare_name_is_cwd() {
        assert_eq!(parent_dir(Path::new("config.yaml")), Path::new("."));
        assert_eq!(parent_dir(Path::new("a/b.yaml")), Path::new("a"));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("doc.yaml");

        write_atomically(&path, b"first").unwrap();
        write_atomically(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension(Path::new("sheet.CSV")).as_deref(), Some("csv"));
        assert_eq!(extension(Path::new("sheet")), None);
    }
}
