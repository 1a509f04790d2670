use std::io;
use thiserror::Error;

/// Result type for OSF operations
pub type Result<T> = std::result::Result<T, OsfError>;

/// Unified error type for all OSF operations
#[derive(Debug, Error)]
pub enum OsfError {
    // Header errors
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    #[error("Unsupported OSF version: {0}")]
    UnsupportedVersion(u16),

    #[error("OSF file is not finished (no metadata footer recorded)")]
    Incomplete,

    #[error("OSF file is already finished, chunks can no longer be appended")]
    AlreadyFinished,

    // Footer errors
    #[error("Corrupt footer: {0}")]
    CorruptFooter(String),

    #[error("Malformed footer: {0}")]
    MalformedFooter(String),

    #[error("CRC mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    // Entry errors
    #[error("Invalid metadata entry: {0}")]
    InvalidEntry(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OsfError {
    /// True for every error that means the stored footer cannot be trusted.
    ///
    /// These are exactly the conditions `restore_metablob` is meant to
    /// recover from.
    pub fn is_footer_corruption(&self) -> bool {
        matches!(
            self,
            OsfError::CorruptFooter(_)
                | OsfError::MalformedFooter(_)
                | OsfError::ChecksumMismatch { .. }
        )
    }
}
