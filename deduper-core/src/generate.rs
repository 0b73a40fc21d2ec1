use crate::error::{Error, Result};
use crate::format::Format;
use crate::manifest::ManifestWriter;
use crate::progress::ProgressSink;
use crate::signature::compute_signature;
use crate::walk::{regular_files, PathFilter};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct GenerateOptions {
    pub format: Format,
    pub filter: PathFilter,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GenerateReport {
    pub format: Format,
    pub files: usize,
    pub total_bytes: u64,
}

/// Write the list file for the tree under `start_dir`.
///
/// The list is written to a temporary file next to `list_file` and moved into
/// place only once every entry has been written, so a failed run leaves any
/// previous list untouched.
pub fn generate(
    list_file: &Path,
    start_dir: &Path,
    opts: &GenerateOptions,
    progress: &mut dyn ProgressSink,
) -> Result<GenerateReport> {
    let access = |e: std::io::Error| Error::manifest_access(list_file, e);
    let dir = match list_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(access)?;

    // Neither the list being replaced nor its replacement is listed.
    let skip: Vec<PathBuf> = [list_file, tmp.path()]
        .into_iter()
        .filter_map(|p| fs::canonicalize(p).ok())
        .collect();
    let report = write_manifest(BufWriter::new(tmp.as_file_mut()), start_dir, opts, progress, &skip)
        .map_err(|e| match e {
            Error::ManifestAccess { source, .. } => access(source),
            other => other,
        })?;

    if let Ok(meta) = fs::metadata(list_file) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(access)?;
    }
    tmp.persist(list_file).map_err(|e| access(e.error))?;
    info!(
        list = %list_file.display(),
        files = report.files,
        format = %report.format,
        "list file written"
    );
    Ok(report)
}

/// Stream the manifest for `start_dir` into `out`.
///
/// `skip` holds canonical paths that are left out even if the walk finds them.
pub fn write_manifest<W: Write>(
    out: W,
    start_dir: &Path,
    opts: &GenerateOptions,
    progress: &mut dyn ProgressSink,
    skip: &[PathBuf],
) -> Result<GenerateReport> {
    let write_err = |e: std::io::Error| Error::manifest_access(PathBuf::new(), e);
    let mut writer = ManifestWriter::new(out, opts.format).map_err(write_err)?;
    let mut total_bytes = 0u64;

    for ent in regular_files(start_dir, &opts.filter) {
        let ent = ent?;
        if is_skipped(&ent.path, skip) {
            debug!(path = %ent.rel_path, "skipping list file");
            continue;
        }
        let rel_path = ent.line_path()?;
        let sig = compute_signature(&ent.path, opts.format)?;
        debug!(path = %rel_path, signature = %sig, "signed");
        progress.record(rel_path, &sig);
        writer.write_entry(&sig, rel_path).map_err(write_err)?;
        total_bytes += ent.size;
    }

    let files = writer.entries();
    writer.finish().map_err(write_err)?;
    Ok(GenerateReport { format: opts.format, files, total_bytes })
}

fn is_skipped(path: &Path, skip: &[PathBuf]) -> bool {
    skip.iter().any(|s| {
        path.file_name() == s.file_name()
            && fs::canonicalize(path).map(|p| &p == s).unwrap_or(false)
    })
}
