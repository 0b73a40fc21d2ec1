use crate::signature::Signature;
use std::io::{self, Write};

/// Receives every (path, signature) pair as it is produced.
pub trait ProgressSink {
    fn record(&mut self, rel_path: &str, signature: &Signature);
}

/// Drops everything.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn record(&mut self, _rel_path: &str, _signature: &Signature) {}
}

/// Echoes `<signature> <path>` lines when enabled.
pub struct Progress<W: Write = io::Stdout> {
    enabled: bool,
    out: W,
    seen: usize,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self::with_writer(enabled, io::stdout())
    }
}

impl<W: Write> Progress<W> {
    pub fn with_writer(enabled: bool, out: W) -> Self {
        Self { enabled, out, seen: 0 }
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for Progress<W> {
    fn record(&mut self, rel_path: &str, signature: &Signature) {
        self.seen += 1;
        if self.enabled {
            // Observational only; a broken pipe must not fail the run.
            let _ = writeln!(self.out, "{} {}", signature, rel_path);
            let _ = self.out.flush();
        }
    }
}

/// Collects pairs in memory.
impl ProgressSink for Vec<(String, Signature)> {
    fn record(&mut self, rel_path: &str, signature: &Signature) {
        self.push((rel_path.to_string(), signature.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_counts_but_stays_quiet() {
        let mut p = Progress::with_writer(false, Vec::new());
        p.record("a.txt", &Signature::from("abc"));
        assert_eq!(p.seen(), 1);
        assert!(p.into_inner().is_empty());
    }

    #[test]
    fn enabled_echoes_pairs() {
        let mut p = Progress::with_writer(true, Vec::new());
        p.record("a.txt", &Signature::from("abc:1"));
        p.record("sub/b.txt", &Signature::from("def:2"));
        let out = String::from_utf8(p.into_inner()).unwrap();
        assert_eq!(out, "abc:1 a.txt\ndef:2 sub/b.txt\n");
    }
}
