use crate::error::{Error, Result};
use crate::format::Format;
use crate::manifest::{parse_header, parse_line, ManifestEntry};
use crate::path_safety::{validate_path, PathPolicy};
use crate::progress::ProgressSink;
use crate::signature::{compute_signature, Signature};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default)]
pub struct VerifyOptions {
    pub policy: PathPolicy,
}

/// Where the pinned format came from.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FormatSource {
    Header,
    /// No header line; every entry is checked against [`Format::default`].
    /// A list written with another format then mismatches wholesale.
    Default,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MismatchReason {
    Changed { expected: Signature, actual: Signature },
    Unreadable { message: String },
    UnsafePath { message: String },
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub line: usize,
    pub rel_path: String,
    pub reason: MismatchReason,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct VerifyReport {
    pub format: Format,
    pub format_source: FormatSource,
    pub matched: u64,
    pub mismatched: u64,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    fn new(format: Format, format_source: FormatSource) -> Self {
        Self { format, format_source, matched: 0, mismatched: 0, mismatches: Vec::new() }
    }

    pub fn is_ok(&self) -> bool {
        self.mismatched == 0
    }
}

/// Check every entry of `list_file` against the tree under `start_dir`.
pub fn verify(
    list_file: &Path,
    start_dir: &Path,
    opts: &VerifyOptions,
    progress: &mut dyn ProgressSink,
) -> Result<VerifyReport> {
    let f = File::open(list_file).map_err(|e| Error::manifest_access(list_file, e))?;
    verify_reader(BufReader::new(f), start_dir, opts, progress).map_err(|e| match e {
        Error::ManifestAccess { source, .. } => Error::manifest_access(list_file, source),
        other => other,
    })
}

enum State {
    ReadHeader,
    ProcessEntries { format: Format, pending: Option<(usize, String)> },
    Done(VerifyReport),
}

/// Same as [`verify`] for an already opened list.
pub fn verify_reader<R: BufRead>(
    reader: R,
    start_dir: &Path,
    opts: &VerifyOptions,
    progress: &mut dyn ProgressSink,
) -> Result<VerifyReport> {
    let read_err = |e: std::io::Error| Error::manifest_access(Path::new(""), e);
    let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut state = State::ReadHeader;

    loop {
        state = match state {
            State::ReadHeader => match lines.next() {
                None => State::Done(VerifyReport::new(Format::default(), FormatSource::Default)),
                Some((line_no, line)) => {
                    let line = line.map_err(read_err)?;
                    match parse_header(&line)? {
                        Some(format) => {
                            debug!(%format, "format pinned by header");
                            State::ProcessEntries { format, pending: None }
                        }
                        None => {
                            warn!(
                                format = %Format::default(),
                                "list file has no format header; assuming default format"
                            );
                            State::ProcessEntries {
                                format: Format::default(),
                                pending: Some((line_no, line)),
                            }
                        }
                    }
                }
            },
            State::ProcessEntries { format, pending } => {
                let source =
                    if pending.is_some() { FormatSource::Default } else { FormatSource::Header };
                let mut report = VerifyReport::new(format, source);
                let body = pending.map(|(n, l)| (n, Ok(l))).into_iter().chain(lines.by_ref());
                for (line_no, line) in body {
                    let line = line.map_err(read_err)?;
                    if let Some(entry) = parse_line(line_no, &line)? {
                        check_entry(&mut report, line_no, entry, start_dir, opts, progress);
                    }
                }
                State::Done(report)
            }
            State::Done(report) => return Ok(report),
        };
    }
}

fn check_entry(
    report: &mut VerifyReport,
    line: usize,
    entry: ManifestEntry,
    start_dir: &Path,
    opts: &VerifyOptions,
    progress: &mut dyn ProgressSink,
) {
    let ManifestEntry { signature: expected, rel_path } = entry;
    let actual = validate_path(start_dir, Path::new(&rel_path), opts.policy)
        .and_then(|path| compute_signature(&path, report.format));

    let reason = match actual {
        Ok(actual) => {
            progress.record(&rel_path, &actual);
            if actual == expected {
                report.matched += 1;
                return;
            }
            MismatchReason::Changed { expected, actual }
        }
        Err(Error::UnsafePath(message)) => MismatchReason::UnsafePath { message },
        Err(e) => MismatchReason::Unreadable { message: e.to_string() },
    };

    info!(path = %rel_path, line, reason = ?reason, "signature mismatch");
    report.mismatched += 1;
    report.mismatches.push(Mismatch { line, rel_path, reason });
}
