use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

#[derive(Clone, Copy, Debug, Default)]
pub struct PathPolicy {
    pub follow_symlinks: bool,
}

/// Resolve a manifest-relative path against `root`.
///
/// Absolute paths and `..` components are refused. Without `follow_symlinks`
/// any symlink on the way to the target is refused; with it, the canonical
/// target must stay under the canonical root.
pub fn validate_path(root: &Path, rel: &Path, policy: PathPolicy) -> Result<PathBuf> {
    if rel.has_root() || rel.is_absolute() {
        return Err(Error::UnsafePath(format!("absolute paths are not allowed: {:?}", rel)));
    }
    for comp in rel.components() {
        if matches!(comp, Component::ParentDir | Component::Prefix(_)) {
            return Err(Error::UnsafePath(format!("parent traversal not allowed: {:?}", rel)));
        }
    }
    let candidate = root.join(rel);
    if !policy.follow_symlinks {
        let mut cur = root.to_path_buf();
        for comp in rel.components() {
            cur.push(comp);
            if let Ok(m) = std::fs::symlink_metadata(&cur) {
                if m.file_type().is_symlink() {
                    return Err(Error::UnsafePath(format!(
                        "symlink in path (not following): {:?}",
                        cur
                    )));
                }
            }
        }
        Ok(candidate)
    } else {
        let root_can = std::fs::canonicalize(root).map_err(|e| Error::file_access(root, e))?;
        let cand_can =
            std::fs::canonicalize(&candidate).map_err(|e| Error::file_access(&candidate, e))?;
        if !cand_can.starts_with(&root_can) {
            return Err(Error::UnsafePath(format!("path escapes root: {:?}", rel)));
        }
        Ok(cand_can)
    }
}
