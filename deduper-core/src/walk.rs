use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Include/exclude globs matched against `/`-separated relative paths.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    /// An empty include list means "everything".
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        let include = if includes.is_empty() { None } else { Some(build_set(includes)?) };
        Ok(Self { include, exclude: build_set(excludes)? })
    }

    pub fn allows(&self, rel_path: &str) -> bool {
        self.include.as_ref().map_or(true, |set| set.is_match(rel_path))
            && !self.exclude.is_match(rel_path)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for g in patterns {
        b.add(Glob::new(g)?);
    }
    Ok(b.build()?)
}

/// A regular file found under the walk root.
#[derive(Clone, Debug)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// `/`-joined path under the root. Lossy for names that are not UTF-8.
    pub rel_path: String,
    pub size: u64,
    lossless: bool,
}

impl WalkEntry {
    /// The relative path as it may appear in a list file line.
    ///
    /// Fails for names that are not UTF-8 or that contain a line break.
    pub fn line_path(&self) -> Result<&str> {
        if self.lossless && !self.rel_path.contains(['\n', '\r']) {
            Ok(&self.rel_path)
        } else {
            Err(Error::UnrepresentablePath(self.path.clone()))
        }
    }
}

/// Files before subdirectories, then by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Walk `root` and yield its regular files in a stable order.
///
/// At each level the files come first, then the subdirectories, both sorted by
/// name; subdirectories are descended depth-first. Symlinks are not followed
/// and are not yielded.
pub fn regular_files<'a>(
    root: &'a Path,
    filter: &'a PathFilter,
) -> impl Iterator<Item = Result<WalkEntry>> + 'a {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by(files_first)
        .into_iter()
        .filter_map(move |ent| {
            let ent = match ent {
                Ok(ent) => ent,
                Err(e) => return Some(Err(Error::from(e))),
            };
            if !ent.file_type().is_file() {
                return None;
            }
            let (rel_path, lossless) = rel_path_of(root, ent.path());
            if !filter.allows(&rel_path) {
                return None;
            }
            let size = match ent.metadata() {
                Ok(m) => m.len(),
                Err(e) => return Some(Err(Error::from(e))),
            };
            Some(Ok(WalkEntry { path: ent.into_path(), rel_path, size, lossless }))
        })
}

/// Relative path of `path` under `root`, components joined with `/`.
///
/// The flag is false when a component had to be converted lossily.
pub fn rel_path_of(root: &Path, path: &Path) -> (String, bool) {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let mut lossless = true;
    let parts: Vec<_> = rel
        .components()
        .map(|comp| {
            let s = comp.as_os_str().to_string_lossy();
            lossless &= matches!(s, std::borrow::Cow::Borrowed(_));
            s
        })
        .collect();
    (parts.join("/"), lossless)
}
