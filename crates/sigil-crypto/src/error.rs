use thiserror::Error;

/// Errors from signing and key handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A phi key failed its base58check decoding.
    #[error("invalid phi key: {0}")]
    InvalidPhiKey(String),
}
