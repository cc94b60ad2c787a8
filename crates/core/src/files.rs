//! Safe whole-file replacement
//!
//! Configuration files are replaced via backup + temp + rename, so an
//! interrupted run leaves either the old content or the new content on
//! disk, never a truncated file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Path of the pre-write backup for `path` (same name with `.bak` appended).
pub fn backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".bak")
}

/// Replace the file at `path` with `content`.
///
/// An existing file is first copied to [`backup_path`]; the new content
/// is then written to a sibling temp file and renamed over the original.
pub fn replace_file(path: &Path, content: &str) -> io::Result<()> {
    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    let tmp = sibling_with_suffix(path, ".tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
