//! Collision-free naming for written files
//!
//! Repeated substitution runs write under the same logical name; appending
//! `_N` before the extension guarantees no run silently overwrites an
//! unrelated prior output.

use std::path::{Path, PathBuf};

/// Split a path into everything before the extension and the extension
/// itself (dot included). A dot that begins the filename does not start an
/// extension, so `.bashrc` has none.
pub fn split_extension(path: &Path) -> (String, String) {
    let full = path.to_string_lossy();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.rfind('.').filter(|&pos| pos > 0) {
        Some(pos) => {
            let ext_len = name.len() - pos;
            let stem_len = full.len() - ext_len;
            (full[..stem_len].to_string(), full[stem_len..].to_string())
        }
        None => (full.into_owned(), String::new()),
    }
}

/// Return `desired` if nothing exists there; otherwise insert `_N` before
/// the extension, trying N = 0, 1, 2, … until an unused path is found.
pub fn dedup_path(desired: PathBuf) -> PathBuf {
    if !desired.exists() {
        return desired;
    }
    let (stem, ext) = split_extension(&desired);
    let mut n: u64 = 0;
    loop {
        let candidate = PathBuf::from(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Desired output path for a source file and a mangle suffix, e.g.
/// `notes.txt` + `_sed` → `notes_sed.txt`.
pub fn mangle_path(source: &Path, suffix: &str) -> PathBuf {
    let (stem, ext) = split_extension(source);
    PathBuf::from(format!("{stem}{suffix}{ext}"))
}
