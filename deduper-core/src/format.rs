use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature format. Selects how much of a file is hashed and whether the
/// file size is appended to the digest.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Partial,
    PartialWithSize,
    Full,
    #[default]
    FullWithSize,
}

/// The two independent switches a [`Format`] resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureMode {
    pub partial: bool,
    pub include_file_size: bool,
}

impl SignatureMode {
    /// Same hashing, never a size suffix.
    pub fn without_size(self) -> Self {
        Self { include_file_size: false, ..self }
    }
}

impl Format {
    pub const ALL: [Format; 4] =
        [Format::Partial, Format::PartialWithSize, Format::Full, Format::FullWithSize];

    pub fn mode(self) -> SignatureMode {
        let (partial, include_file_size) = match self {
            Format::Partial => (true, false),
            Format::PartialWithSize => (true, true),
            Format::Full => (false, false),
            Format::FullWithSize => (false, true),
        };
        SignatureMode { partial, include_file_size }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Partial => "partial",
            Format::PartialWithSize => "partial-with-size",
            Format::Full => "full",
            Format::FullWithSize => "full-with-size",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Format::ALL
            .into_iter()
            .find(|fmt| fmt.name() == s)
            .ok_or_else(|| Error::UnsupportedFormat(s.to_string()))
    }
}
