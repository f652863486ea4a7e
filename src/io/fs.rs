use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

/// Reject `-` as an output path.
pub fn assert_not_stdout(path: &Path) -> Result<()> {
    if path == Path::new("-") {
        bail!("stdout is not supported; provide a real file path.");
    }
    Ok(())
}

/// Fail if `target` exists and overwriting was not requested.
pub fn check_overwrite(target: &Path, force: bool) -> Result<()> {
    if !force && target.exists() {
        bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
    }
    Ok(())
}

/// Write `target` through a temporary file in the same directory, then rename
/// it into place, so a failed write never leaves a truncated artifact behind.
pub(crate) fn write_atomic(target: &Path, write: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    let parent = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("[io::fs] create dir {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("[io::fs] create temp file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush().context("[io::fs] flush temp file")?;
    }
    tmp.as_file().sync_all().ok(); // best-effort fsync file
    tmp.persist(target)
        .with_context(|| format!("[io::fs] rename to {}", target.display()))?;
    File::open(parent).and_then(|f| f.sync_all()).ok(); // best-effort fsync dir
    Ok(())
}

/// Write any serializable value as pretty JSON.
pub(crate) fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, value)
            .with_context(|| format!("[io::fs] Failed to write JSON to {:?}", path))?;
        Ok(out.write_all(b"\n")?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_is_rejected() {
        assert!(assert_not_stdout(Path::new("-")).is_err());
        assert!(assert_not_stdout(Path::new("out.geojson")).is_ok());
    }

    #[test]
    fn atomic_write_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("a.txt");

        write_atomic(&target, |w| Ok(w.write_all(b"first")?)).unwrap();
        write_atomic(&target, |w| Ok(w.write_all(b"second")?)).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "second");

        assert!(check_overwrite(&target, false).is_err());
        assert!(check_overwrite(&target, true).is_ok());
    }

    #[test]
    fn failed_write_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("b.txt");
        assert!(write_atomic(&target, |_| bail!("boom")).is_err());
        assert!(!target.exists());
    }
}
