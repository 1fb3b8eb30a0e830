use thiserror::Error;

use crate::traits::{ProofError, VerifyError};

/// Errors from the membership proof subsystem.
#[derive(Error, Debug)]
pub enum ZkError {
    /// A required input was empty after trimming.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// The secret does not hash to the caller's expected value.
    #[error("public input mismatch: expected {expected}, computed {computed}")]
    PublicInputMismatch {
        /// Normalized expected hash.
        expected: String,
        /// Hash of the supplied secret.
        computed: String,
    },

    /// A freshly generated proof failed verification.
    #[error("proof verification failed")]
    ProofVerificationFailed,

    /// A value is not a canonical field element.
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    /// Proof or key bytes could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZkError {
    /// Machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "MISSING_INPUT",
            Self::PublicInputMismatch { .. } => "PUBLIC_INPUT_MISMATCH",
            Self::ProofVerificationFailed => "PROOF_VERIFICATION_FAILED",
            Self::InvalidFieldElement(_) => "INVALID_INPUT",
            Self::Verify(VerifyError::MalformedProof(_)) => "MALFORMED_PROOF",
            Self::Encoding(_) | Self::Proof(_) | Self::Verify(_) | Self::Io(_) => "ZK_INTERNAL",
        }
    }

    /// Whether the error is caused by the request rather than the prover.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput(_)
                | Self::PublicInputMismatch { .. }
                | Self::ProofVerificationFailed
                | Self::InvalidFieldElement(_)
                | Self::Verify(VerifyError::MalformedProof(_))
        )
    }
}
