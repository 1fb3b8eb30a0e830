use serde::Serialize;
use thiserror::Error;

/// A single lineage verification failure.
///
/// Verification collects every failure it finds instead of stopping at the
/// first, so these are values in a report as much as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineageError {
    /// The child document carries no position claim.
    #[error("child document has no embedded position claim")]
    ClaimMissing,

    /// The embedded claim could not be parsed.
    #[error("embedded claim is invalid: {reason}")]
    ClaimInvalid { reason: String },

    /// The child's declared root hash is not the root document's hash.
    #[error("lineage root mismatch: child declares {declared}, root document hashes to {recomputed}")]
    RootHashMismatch { declared: String, recomputed: String },

    /// The embedded lineage id does not match the recomputed one.
    #[error("lineage id mismatch: embedded {declared}, expected {expected}")]
    LineageIdMismatch { declared: String, expected: String },

    /// The embedded phi key is not derived from the embedded Kai signature.
    #[error("phi key mismatch: embedded {declared}, derived {derived}")]
    PhiKeyMismatch { declared: String, derived: String },

    /// A phi key is present without the Kai signature it derives from.
    #[error("phi key present without a kai signature")]
    MissingSignature,

    /// The claim's Kai moment is inconsistent with its own pulse.
    #[error("invalid kai moment: {reason}")]
    InvalidMoment { reason: String },

    /// Hashing the claim context failed.
    #[error("canonicalization failed: {reason}")]
    Codec { reason: String },
}

impl From<sigil_core::CodecError> for LineageError {
    fn from(e: sigil_core::CodecError) -> Self {
        Self::Codec {
            reason: e.to_string(),
        }
    }
}

impl From<sigil_core::KaiError> for LineageError {
    fn from(e: sigil_core::KaiError) -> Self {
        Self::InvalidMoment {
            reason: e.to_string(),
        }
    }
}
