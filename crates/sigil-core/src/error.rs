//! # Error Types
//!
//! Input errors raised by the codec and the Kai clock. Both are caller bugs:
//! they carry enough context to locate the offending value and are never
//! retried.

use thiserror::Error;

/// Error during canonicalization or domain hashing.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A number was NaN or infinite.
    #[error("invalid number: {0} is not finite")]
    InvalidNumber(String),

    /// The value cannot be represented as a canonical payload.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error converting a wall-clock instant into Kai time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KaiError {
    /// The instant was NaN or infinite.
    #[error("instant {0} is not a finite number of milliseconds")]
    NonFiniteInstant(f64),

    /// The instant is too far from genesis to be addressed by a pulse.
    #[error("instant {0} ms is out of the addressable pulse range")]
    InstantOutOfRange(f64),

    /// The instant precedes the Kai genesis.
    #[error("instant {instant_ms} ms precedes genesis")]
    BeforeGenesis {
        /// The rejected instant.
        instant_ms: f64,
    },

    /// A stored moment is internally inconsistent.
    #[error("invalid kai moment: {0}")]
    InvalidMoment(String),
}
