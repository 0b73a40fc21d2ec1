//! Duplicate finder built on the signature engine.
//!
//! Candidates are narrowed in three passes: equal size, equal partial
//! signature, equal full signature. Each pass drops groups with a single
//! member, so the expensive full hash only runs on files that already agree on
//! size and leading bytes.

use crate::error::{Error, Result};
use crate::format::Format;
use crate::signature::{compute_signature, Signature, READ_CHUNK};
use crate::walk::{regular_files, PathFilter};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

const COPY_PREFIX: &str = "Copy of ";

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// What to do with each group of identical files.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Keep everything.
    #[default]
    Nop,
    /// Keep the first file in copy-aware order, remove the rest.
    KeepFirst,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Nop => "nop",
            Strategy::KeepFirst => "keep-first",
        }
    }

    /// Split a group into (keep, remove).
    pub fn apply(self, paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
        match self {
            Strategy::Nop => (paths.to_vec(), Vec::new()),
            Strategy::KeepFirst => {
                let mut sorted = paths.to_vec();
                sorted.sort_by(|a, b| copy_aware_cmp(a, b));
                let rest = sorted.split_off(sorted.len().min(1));
                (sorted, rest)
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Strategy::Nop, Strategy::KeepFirst]
            .into_iter()
            .find(|st| st.name() == s)
            .ok_or_else(|| Error::UnsupportedStrategy(s.to_string()))
    }
}

/// Order used by [`Strategy::KeepFirst`].
///
/// Files are ordered by directory first. Within a directory `Copy of x` sorts
/// right after `x`; other names compare as strings with the prefix removed.
pub fn copy_aware_cmp(a: &Path, b: &Path) -> Ordering {
    let na = file_name(a);
    let nb = file_name(b);
    let (copy_a, base_a) = strip_copy(&na);
    let (copy_b, base_b) = strip_copy(&nb);
    a.parent()
        .cmp(&b.parent())
        .then_with(|| base_a.cmp(base_b))
        .then_with(|| copy_a.cmp(&copy_b))
}

fn file_name(p: &Path) -> String {
    p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn strip_copy(name: &str) -> (bool, &str) {
    match name.strip_prefix(COPY_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, name),
    }
}

pub fn pretty_byte_count(n: u64) -> String {
    if n >= GIB {
        format!("{:.1} GiB", n as f64 / GIB as f64)
    } else if n >= MIB {
        format!("{:.1} MiB", n as f64 / MIB as f64)
    } else {
        format!("{} bytes", n)
    }
}

/// Refuses shallow roots such as `/` or `/home/user`.
pub fn is_safe_dir(path: &Path) -> bool {
    path.components().filter(|c| matches!(c, Component::Normal(_))).count() >= 3
}

#[derive(Clone, Debug)]
pub struct DedupeOptions {
    pub strategy: Strategy,
    pub dry_run: bool,
    pub filter: PathFilter,
    /// Compare every group byte-for-byte before the strategy runs.
    pub verify_groups: bool,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            dry_run: true,
            filter: PathFilter::default(),
            verify_groups: false,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub signature: Signature,
    pub size: u64,
    pub keep: Vec<PathBuf>,
    pub remove: Vec<PathBuf>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DedupeReport {
    pub strategy: Strategy,
    pub dry_run: bool,
    pub size_candidates: usize,
    pub partial_candidates: usize,
    pub duplicate_files: usize,
    pub duplicate_bytes: u64,
    pub groups: Vec<DuplicateGroup>,
    pub removed: Vec<PathBuf>,
    pub bytes_freed: u64,
}

/// Group regular files under `root` by size, dropping unique sizes.
pub fn scan_sizes(root: &Path, filter: &PathFilter) -> Result<BTreeMap<u64, Vec<PathBuf>>> {
    let mut by_size: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();
    for ent in regular_files(root, filter) {
        let ent = ent?;
        by_size.entry(ent.size).or_default().push(ent.path);
    }
    Ok(prune(by_size))
}

/// Regroup candidate groups by signature under `format`, dropping singletons.
pub fn group_by_signature<'a, I>(groups: I, format: Format) -> Result<BTreeMap<Signature, Vec<PathBuf>>>
where
    I: IntoIterator<Item = &'a Vec<PathBuf>>,
{
    let mut by_sig: BTreeMap<Signature, Vec<PathBuf>> = BTreeMap::new();
    for paths in groups {
        for path in paths {
            let sig = compute_signature(path, format)?;
            by_sig.entry(sig).or_default().push(path.clone());
        }
    }
    Ok(prune(by_sig))
}

fn prune<K: Ord>(groups: BTreeMap<K, Vec<PathBuf>>) -> BTreeMap<K, Vec<PathBuf>> {
    groups.into_iter().filter(|(_, paths)| paths.len() > 1).collect()
}

fn file_count<K>(groups: &BTreeMap<K, Vec<PathBuf>>) -> usize {
    groups.values().map(Vec::len).sum()
}

/// True when both files hold exactly the same bytes.
pub fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    let open = |p: &Path| File::open(p).map_err(|e| Error::file_access(p, e));
    let (fa, fb) = (open(a)?, open(b)?);
    let len = |f: &File, p: &Path| {
        f.metadata().map(|m| m.len()).map_err(|e| Error::file_access(p, e))
    };
    if len(&fa, a)? != len(&fb, b)? {
        return Ok(false);
    }

    let mut ra = BufReader::with_capacity(READ_CHUNK, fa);
    let mut rb = BufReader::with_capacity(READ_CHUNK, fb);
    let mut ba = vec![0u8; READ_CHUNK];
    let mut bb = vec![0u8; READ_CHUNK];
    loop {
        let na = fill(&mut ra, &mut ba).map_err(|e| Error::file_access(a, e))?;
        let nb = fill(&mut rb, &mut bb).map_err(|e| Error::file_access(b, e))?;
        if na != nb || ba[..na] != bb[..nb] {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match r.read(&mut buf[n..])? {
            0 => break,
            k => n += k,
        }
    }
    Ok(n)
}

/// Check that every file of each group matches the group's first file.
///
/// Every differing pair is logged before the check fails.
pub fn check_groups(groups: &BTreeMap<Signature, Vec<PathBuf>>) -> Result<()> {
    let mut failures = 0;
    for paths in groups.values() {
        let Some((first, rest)) = paths.split_first() else {
            continue;
        };
        for p in rest {
            if !same_contents(first, p)? {
                warn!(first = %first.display(), other = %p.display(), "file comparison failed");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        return Err(Error::GroupMismatch(failures));
    }
    Ok(())
}

pub fn find_duplicates(root: &Path, opts: &DedupeOptions) -> Result<DedupeReport> {
    let by_size = scan_sizes(root, &opts.filter)?;
    let size_candidates = file_count(&by_size);
    info!("size scan found {} candidate files", size_candidates);

    let by_partial = group_by_signature(by_size.values(), Format::PartialWithSize)?;
    let partial_candidates = file_count(&by_partial);
    info!("signature scan found {} candidate files", partial_candidates);

    let by_full = group_by_signature(by_partial.values(), Format::FullWithSize)?;
    if opts.verify_groups {
        check_groups(&by_full)?;
        debug!(groups = by_full.len(), "byte-for-byte check passed");
    }

    let mut report = DedupeReport {
        strategy: opts.strategy,
        dry_run: opts.dry_run,
        size_candidates,
        partial_candidates,
        duplicate_files: 0,
        duplicate_bytes: 0,
        groups: Vec::new(),
        removed: Vec::new(),
        bytes_freed: 0,
    };

    for (signature, paths) in by_full {
        let size = signature.file_size().unwrap_or(0);
        let extra = paths.len() - 1;
        report.duplicate_files += extra;
        report.duplicate_bytes += size * extra as u64;

        let (keep, remove) = opts.strategy.apply(&paths);
        debug!(
            strategy = %opts.strategy,
            keep = ?keep,
            remove = ?remove,
            "duplicate group {}", signature
        );
        for path in &remove {
            debug!(path = %path.display(), dry_run = opts.dry_run, "removing");
            if !opts.dry_run {
                std::fs::remove_file(path).map_err(|e| Error::file_access(path, e))?;
            }
            report.bytes_freed += size;
            report.removed.push(path.clone());
        }
        report.groups.push(DuplicateGroup { signature, size, keep, remove });
    }

    info!(
        "found {} duplicate files occupying {}",
        report.duplicate_files,
        pretty_byte_count(report.duplicate_bytes)
    );
    info!(
        "strategy \"{}\" {} {} files and freed {}",
        opts.strategy,
        if opts.dry_run { "would delete" } else { "deleted" },
        report.removed.len(),
        pretty_byte_count(report.bytes_freed)
    );
    Ok(report)
}
