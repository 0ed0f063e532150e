//! Lexical path checks for workspace-scoped auto-approval.

use std::path::{Component, Path, PathBuf};

/// Whether `requested` resolves to a location strictly inside `cwd`.
///
/// Resolution is lexical (no symlink or filesystem lookup): `requested` is joined
/// onto `cwd`, `.` and `..` components are folded, and the result must sit below
/// `cwd`. The workspace root itself does not count.
pub fn is_within_workspace(cwd: &Path, requested: &str) -> bool {
    let requested = requested.trim();
    if requested.is_empty() {
        return false;
    }
    let base = normalize(cwd);
    let resolved = normalize(&cwd.join(requested));
    match resolved.strip_prefix(&base) {
        Ok(relative) => relative.components().next().is_some(),
        Err(_) => false,
    }
}

/// Fold `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
