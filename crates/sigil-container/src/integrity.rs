//! # Payload Integrity
//!
//! Sealing canonicalizes the payload, compresses it, hashes the canonical
//! bytes and optionally signs the lowercase hash hex; without a signer it
//! writes an empty signature naming the header's owner. Opening reverses the
//! encoding and checks the hash before anything else: a payload whose hash
//! does not match is rejected no matter what its signature says.

use serde_json::{Map, Value};
use sigil_core::{compute_digest, CanonicalBytes, ContentDigest, DigestAlgorithm};
use sigil_crypto::{verify_digest, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use subtle::ConstantTimeEq;

use crate::codec::{gunzip_base64, gzip_base64};
use crate::error::ContainerError;
use crate::metadata::{
    EmbeddedMetadata, Integrity, PayloadEncoding, PayloadHash, PayloadSignature,
    SignatureAlgorithm,
};

/// Something that can sign a payload hash.
pub trait PayloadSigner {
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Display form of the public key embedded next to the signature.
    fn public(&self) -> String;

    /// Sign the lowercase hex of `digest`, returning lowercase hex.
    fn sign_hash(&self, digest: &ContentDigest) -> String;
}

impl PayloadSigner for Ed25519KeyPair {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn public(&self) -> String {
        self.public_key().to_hex()
    }

    fn sign_hash(&self, digest: &ContentDigest) -> String {
        self.sign_digest(digest).to_hex()
    }
}

/// Outcome of the signature check in [`open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// An Ed25519 signature verified against the embedded key.
    Verified { public: String },
    /// The signature algorithm needs an external verifier.
    Unverifiable { algorithm: SignatureAlgorithm },
    /// The signature value is empty.
    Unsigned,
}

/// A container whose payload passed the integrity checks.
#[derive(Debug, Clone)]
pub struct OpenedContainer {
    pub header: Map<String, Value>,
    pub payload: Value,
    /// Decoded canonical payload bytes.
    pub payload_bytes: Vec<u8>,
    pub digest: ContentDigest,
    pub signature: SignatureStatus,
}

/// Identity recorded in an unsigned placeholder: the header's
/// `userPhiKey`, else its `creatorId`, else nothing.
fn header_owner(header: &Map<String, Value>) -> String {
    ["userPhiKey", "creatorId"]
        .iter()
        .find_map(|k| header.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Build container metadata for `payload`.
pub fn seal(
    payload: &Value,
    header: Map<String, Value>,
    hash_alg: DigestAlgorithm,
    signer: Option<&dyn PayloadSigner>,
) -> Result<EmbeddedMetadata, ContainerError> {
    let bytes = CanonicalBytes::from_value(payload)?;
    let digest = compute_digest(hash_alg, bytes.as_bytes());
    let payload_signature = match signer {
        Some(s) => PayloadSignature {
            alg: s.algorithm(),
            public: s.public(),
            value: s.sign_hash(&digest),
        },
        None => PayloadSignature::unsigned(header_owner(&header)),
    };
    Ok(EmbeddedMetadata {
        header,
        payload: gzip_base64(bytes.as_bytes())?,
        integrity: Integrity {
            payload_encoding: PayloadEncoding::GzipBase64,
            payload_hash: PayloadHash::from_digest(&digest),
            payload_signature,
        },
    })
}

/// Decode the payload and check its hash and signature.
pub fn open(meta: &EmbeddedMetadata) -> Result<OpenedContainer, ContainerError> {
    let bytes = gunzip_base64(&meta.payload)?;
    let declared = &meta.integrity.payload_hash;
    let computed = compute_digest(declared.alg, &bytes);
    let declared_hex = declared.value.trim().to_ascii_lowercase();
    let computed_hex = computed.to_hex();
    if !bool::from(computed_hex.as_bytes().ct_eq(declared_hex.as_bytes())) {
        return Err(ContainerError::PayloadHashMismatch {
            expected: declared_hex,
            computed: computed_hex,
        });
    }

    let sig = &meta.integrity.payload_signature;
    let signature = if sig.is_unsigned() {
        SignatureStatus::Unsigned
    } else {
        match sig.alg {
            SignatureAlgorithm::Ed25519 => {
                let public = Ed25519PublicKey::from_hex(&sig.public)
                    .map_err(|e| ContainerError::SignatureInvalid(e.to_string()))?;
                let value = Ed25519Signature::from_hex(&sig.value)
                    .map_err(|e| ContainerError::SignatureInvalid(e.to_string()))?;
                verify_digest(&computed, &value, &public)
                    .map_err(|e| ContainerError::SignatureInvalid(e.to_string()))?;
                SignatureStatus::Verified {
                    public: public.to_hex(),
                }
            }
            algorithm => SignatureStatus::Unverifiable { algorithm },
        }
    };

    let payload = serde_json::from_slice(&bytes)
        .map_err(|e| ContainerError::PayloadDecode(format!("payload is not JSON: {e}")))?;
    Ok(OpenedContainer {
        header: meta.header.clone(),
        payload,
        payload_bytes: bytes,
        digest: computed,
        signature,
    })
}
