pub mod dedupe;
pub mod error;
pub mod format;
pub mod generate;
pub mod localize;
pub mod manifest;
pub mod path_safety;
pub mod progress;
pub mod show;
pub mod signature;
pub mod verify;
pub mod walk;

pub use error::{Error, Result};
pub use format::Format;
pub use signature::{compute_signature, Signature};
