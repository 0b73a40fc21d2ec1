//! Line-oriented list file format.
//!
//! ```text
//! # format: full-with-size
//! <signature> <relative/path>
//! ```
//!
//! Only the first line may carry the format header. Blank lines and other
//! `#` lines are ignored when reading.

use crate::error::{Error, Result};
use crate::format::Format;
use crate::signature::Signature;
use std::io::{self, Write};

pub const HEADER_PREFIX: &str = "# format:";
pub const COMMENT_PREFIX: char = '#';

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub signature: Signature,
    pub rel_path: String,
}

pub fn header_line(format: Format) -> String {
    format!("{} {}", HEADER_PREFIX, format)
}

/// `Some(format)` for a header line, `None` for anything else.
/// A header naming an unknown format is an error.
pub fn parse_header(line: &str) -> Result<Option<Format>> {
    match strip_eol(line).strip_prefix(HEADER_PREFIX) {
        Some(rest) => Ok(Some(rest.trim().parse()?)),
        None => Ok(None),
    }
}

/// Parse one body line. `line_no` is 1-based and only used for errors.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ManifestEntry>> {
    let line = strip_eol(line);
    if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
        return Ok(None);
    }
    match line.split_once(' ') {
        Some((sig, rel)) if !sig.is_empty() && !rel.is_empty() => Ok(Some(ManifestEntry {
            signature: Signature::from(sig),
            rel_path: rel.to_string(),
        })),
        _ => Err(Error::ManifestParse { line: line_no, content: line.to_string() }),
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Writes a header followed by entries.
pub struct ManifestWriter<W: Write> {
    out: W,
    entries: usize,
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(mut out: W, format: Format) -> io::Result<Self> {
        writeln!(out, "{}", header_line(format))?;
        Ok(Self { out, entries: 0 })
    }

    pub fn write_entry(&mut self, signature: &Signature, rel_path: &str) -> io::Result<()> {
        self.entries += 1;
        writeln!(self.out, "{} {}", signature, rel_path)
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
