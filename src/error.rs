//! Error conditions surfaced by the certificate lifecycle.

use std::io;
use std::path::PathBuf;

/// Every failure the lifecycle can report to its caller.
///
/// Variants that concern a file always carry the exact path, so an operator
/// reading the message knows which file to fix.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    /// Key pair or certificate construction failed. Never retried.
    #[error("certificate generation failed: {0}")]
    GenerationFailure(String),

    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file does not contain the expected PEM marker.
    #[error("invalid PEM format in {}", path.display())]
    InvalidFormat { path: PathBuf },

    /// A required file is absent.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Options rejected before touching the filesystem.
    #[error("invalid certificate options: {0}")]
    InvalidOptions(String),

    /// Directory creation, locking or persisting failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<rcgen::Error> for CertError {
    fn from(e: rcgen::Error) -> Self {
        CertError::GenerationFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CertError>;
