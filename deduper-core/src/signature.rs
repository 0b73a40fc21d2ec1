use crate::error::{Error, Result};
use crate::format::{Format, SignatureMode};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading bytes hashed by the partial formats.
pub const PARTIAL_BYTES: u64 = 1024;

/// Read size for full hashing.
pub const READ_CHUNK: usize = 64 * 1024;

/// Separates the hex digest from the file size in `*-with-size` signatures.
pub const SIZE_SEPARATOR: char = ':';

/// `<sha1-hex>` or `<sha1-hex>:<size>`, depending on the format it was made with.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digest without any size suffix.
    pub fn digest(&self) -> &str {
        self.0.split(SIZE_SEPARATOR).next().unwrap_or(&self.0)
    }

    /// The size suffix, when present and numeric.
    pub fn file_size(&self) -> Option<u64> {
        let (_, size) = self.0.split_once(SIZE_SEPARATOR)?;
        size.parse().ok()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Signature {
    fn from(s: String) -> Self {
        Signature(s)
    }
}

impl From<&str> for Signature {
    fn from(s: &str) -> Self {
        Signature(s.to_string())
    }
}

pub fn compute_signature(path: &Path, format: Format) -> Result<Signature> {
    compute_with_mode(path, format.mode())
}

pub fn compute_with_mode(path: &Path, mode: SignatureMode) -> Result<Signature> {
    let access = |e: std::io::Error| Error::file_access(path, e);
    let mut f = File::open(path).map_err(access)?;
    let file_size = f.metadata().map_err(access)?.len();

    let mut hasher = Sha1::new();
    if mode.partial {
        let mut head = Vec::with_capacity(PARTIAL_BYTES as usize);
        (&mut f).take(PARTIAL_BYTES).read_to_end(&mut head).map_err(access)?;
        hasher.update(&head);
    } else {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = f.read(&mut buf).map_err(access)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    let digest = hasher.finalize();

    let sig = if mode.include_file_size {
        format!("{digest:x}{SIZE_SEPARATOR}{file_size}")
    } else {
        format!("{digest:x}")
    };
    Ok(Signature(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_and_size_accessors() {
        let s = Signature::from("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d:5");
        assert_eq!(s.digest(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(s.file_size(), Some(5));

        let bare = Signature::from("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(bare.digest(), bare.as_str());
        assert_eq!(bare.file_size(), None);
    }

    #[test]
    fn known_vectors() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("hello.txt");
        std::fs::write(&p, b"hello").unwrap();
        assert_eq!(
            compute_signature(&p, Format::Full).unwrap().as_str(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
        assert_eq!(
            compute_signature(&p, Format::FullWithSize).unwrap().as_str(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d:5"
        );

        let empty = td.path().join("empty");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(
            compute_signature(&empty, Format::PartialWithSize).unwrap().as_str(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709:0"
        );
    }

    #[test]
    fn missing_file_is_file_access() {
        let td = tempfile::tempdir().unwrap();
        let err = compute_signature(&td.path().join("nope"), Format::Full).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }
}
