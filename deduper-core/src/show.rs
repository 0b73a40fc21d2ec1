use crate::error::Result;
use crate::format::Format;
use crate::signature::{compute_with_mode, Signature};
use std::path::{Path, PathBuf};

/// Signature of a single file as shown to the user: hashed per `format`, but
/// never with a size suffix, whatever the format says.
pub fn show_signature(path: &Path, format: Format) -> Result<Signature> {
    compute_with_mode(path, format.mode().without_size())
}

/// [`show_signature`] for each path, in order. Stops at the first unreadable file.
pub fn show_signatures<P: AsRef<Path>>(
    paths: &[P],
    format: Format,
) -> Result<Vec<(PathBuf, Signature)>> {
    paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            show_signature(p, format).map(|sig| (p.to_path_buf(), sig))
        })
        .collect()
}
