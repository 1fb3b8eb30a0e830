//! # Ledger Errors

use sigil_core::CodecError;
use thiserror::Error;

/// Failure of a [`LedgerStorage`](crate::LedgerStorage) backend.
///
/// These never reach registry callers; the registry logs them and reports
/// [`Persistence::MemoryOnly`](crate::Persistence::MemoryOnly) instead.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage quota exceeded: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned to registry callers.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The event is rejected before an id is derived for it.
    #[error("invalid ledger event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
