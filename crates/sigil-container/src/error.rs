use sigil_core::CodecError;
use thiserror::Error;

/// Errors from reading, writing, or opening a sigil container.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// No `<metadata>` block with content was found.
    #[error("no metadata block found")]
    MetadataMissing,

    /// Metadata blocks exist but none holds a parseable JSON object.
    #[error("metadata is not JSON: {0}")]
    MetadataNotJson(String),

    /// The JSON object does not have the container shape.
    #[error("invalid metadata shape: {0}")]
    MetadataInvalidShape(String),

    /// The document cannot receive a metadata block.
    #[error("malformed document: {0}")]
    DocumentMalformed(String),

    /// The payload is not valid gzip+base64 or not JSON once decoded.
    #[error("payload decode failed: {0}")]
    PayloadDecode(String),

    /// The recomputed payload hash differs from the declared one.
    #[error("payload hash mismatch: declared {expected}, computed {computed}")]
    PayloadHashMismatch { expected: String, computed: String },

    /// An Ed25519 payload signature did not verify.
    #[error("payload signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("canonicalization failed: {0}")]
    Codec(#[from] CodecError),
}

impl ContainerError {
    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MetadataMissing => "METADATA_MISSING",
            Self::MetadataNotJson(_) => "METADATA_NOT_JSON",
            Self::MetadataInvalidShape(_) => "METADATA_INVALID_SHAPE",
            Self::DocumentMalformed(_) => "SVG_PARSE_FAILED",
            Self::PayloadDecode(_) => "PAYLOAD_DECODE_FAILED",
            Self::PayloadHashMismatch { .. } => "PAYLOAD_HASH_MISMATCH",
            Self::SignatureInvalid(_) => "SIGNATURE_INVALID",
            Self::Codec(_) => "CANONICALIZATION_FAILED",
        }
    }
}
