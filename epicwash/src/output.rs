//! Atomic output files.
//!
//! Results are staged in a temporary file next to the destination and only
//! renamed over it once everything has been written and flushed. A failed
//! run drops the temporary file, which deletes it, and leaves the
//! destination as it was.

use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Result, WashError};

/// Write `path` through `write`, replacing it only if `write` succeeds.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(|e| WashError::io(dir, e))?;
    debug!(
        "Staging {} in {}",
        path.display(),
        staged.path().display()
    );

    let mut writer = BufWriter::new(staged);
    write(&mut writer)?;
    writer.flush().map_err(|e| WashError::io(path, e))?;
    let staged = writer
        .into_inner()
        .map_err(|e| WashError::io(path, e.into_error()))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| WashError::io(path, e))?;

    staged
        .persist(path)
        .map_err(|e| WashError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dmc");
        write_atomically(&path, |w| {
            writeln!(w, "hello").map_err(|e| WashError::io("out.dmc", e))
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_failure_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dmc");
        let result = write_atomically(&path, |w| {
            writeln!(w, "partial").map_err(|e| WashError::io("out.dmc", e))?;
            Err(WashError::InvalidConfig("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failure_keeps_previous_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dmc");
        std::fs::write(&path, "old\n").unwrap();
        let result = write_atomically(&path, |_| Err(WashError::InvalidConfig("boom".to_string())));
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\n");
    }
}
