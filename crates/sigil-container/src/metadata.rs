//! Typed shape of the embedded container object.
//!
//! ```json
//! {
//!   "header": { "...": "small human-readable fields" },
//!   "payload": "<base64 of gzip(canonical JSON bytes)>",
//!   "integrity": {
//!     "payloadEncoding": "gzip+base64",
//!     "payloadHash": { "alg": "blake3", "value": "<hex>" },
//!     "payloadSignature": { "alg": "ed25519", "public": "<hex>", "value": "<hex>" }
//!   }
//! }
//! ```
//!
//! Every field is checked while parsing. An unknown algorithm or encoding is
//! a shape error, never a silent default. `payloadSignature` is always
//! present; an unsigned container carries an empty `value`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sigil_core::{ContentDigest, DigestAlgorithm};

use crate::error::ContainerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadEncoding {
    #[serde(rename = "gzip+base64")]
    GzipBase64,
}

/// Signature algorithms a container may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// Produced by an external harmonic signer; not verifiable here.
    #[serde(rename = "harmonic-sig")]
    HarmonicSig,
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HarmonicSig => "harmonic-sig",
            Self::Ed25519 => "ed25519",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadHash {
    pub alg: DigestAlgorithm,
    /// Lowercase hex digest of the decoded payload bytes.
    pub value: String,
}

impl PayloadHash {
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self {
            alg: digest.algorithm,
            value: digest.to_hex(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSignature {
    pub alg: SignatureAlgorithm,
    pub public: String,
    /// Lowercase hex signature, or empty when unsigned.
    pub value: String,
}

impl PayloadSignature {
    /// Placeholder for a container sealed without a signer. `public` names
    /// the identity the artifact belongs to, if known.
    pub fn unsigned(public: impl Into<String>) -> Self {
        Self {
            alg: SignatureAlgorithm::HarmonicSig,
            public: public.into(),
            value: String::new(),
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.value.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrity {
    pub payload_encoding: PayloadEncoding,
    pub payload_hash: PayloadHash,
    pub payload_signature: PayloadSignature,
}

/// The object stored in a `sigil-container` metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    #[serde(default)]
    pub header: Map<String, Value>,
    pub payload: String,
    pub integrity: Integrity,
}

impl EmbeddedMetadata {
    /// Parse and validate a JSON value.
    pub fn from_value(value: Value) -> Result<Self, ContainerError> {
        if !value.is_object() {
            return Err(ContainerError::MetadataInvalidShape(
                "metadata must be a JSON object".to_string(),
            ));
        }
        let meta: Self = serde_json::from_value(value)
            .map_err(|e| ContainerError::MetadataInvalidShape(e.to_string()))?;
        meta.validate()?;
        Ok(meta)
    }

    fn validate(&self) -> Result<(), ContainerError> {
        self.declared_digest()?;
        let sig = &self.integrity.payload_signature;
        if !sig.is_unsigned() && sig.public.trim().is_empty() {
            return Err(ContainerError::MetadataInvalidShape(
                "payloadSignature.public is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Declared payload digest.
    pub fn declared_digest(&self) -> Result<ContentDigest, ContainerError> {
        let hash = &self.integrity.payload_hash;
        ContentDigest::from_hex(hash.alg, &hash.value)
            .map_err(|e| ContainerError::MetadataInvalidShape(format!("payloadHash.value: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "header": {"v": 1},
            "payload": "H4sI",
            "integrity": {
                "payloadEncoding": "gzip+base64",
                "payloadHash": {"alg": "blake3", "value": "ab".repeat(32)},
                "payloadSignature": {"alg": "harmonic-sig", "public": "phi", "value": "00"}
            }
        })
    }

    #[test]
    fn parses_valid_shape() {
        let meta = EmbeddedMetadata::from_value(valid()).unwrap();
        assert_eq!(meta.integrity.payload_hash.alg, DigestAlgorithm::Blake3);
        assert_eq!(
            meta.integrity.payload_signature.alg,
            SignatureAlgorithm::HarmonicSig
        );
        assert!(!meta.integrity.payload_signature.is_unsigned());
    }

    #[test]
    fn missing_header_defaults_to_empty() {
        let mut v = valid();
        v.as_object_mut().unwrap().remove("header");
        assert!(EmbeddedMetadata::from_value(v).unwrap().header.is_empty());
    }

    #[test]
    fn unknown_algorithms_are_shape_errors() {
        let mut v = valid();
        v["integrity"]["payloadHash"]["alg"] = json!("md5");
        assert!(matches!(
            EmbeddedMetadata::from_value(v),
            Err(ContainerError::MetadataInvalidShape(_))
        ));

        let mut v = valid();
        v["integrity"]["payloadSignature"]["alg"] = json!("rsa");
        assert!(EmbeddedMetadata::from_value(v).is_err());

        let mut v = valid();
        v["integrity"]["payloadEncoding"] = json!("brotli+base64");
        assert!(EmbeddedMetadata::from_value(v).is_err());
    }

    #[test]
    fn wrong_types_are_shape_errors() {
        let mut v = valid();
        v["payload"] = json!(42);
        assert!(EmbeddedMetadata::from_value(v).is_err());

        let mut v = valid();
        v["header"] = json!("text");
        assert!(EmbeddedMetadata::from_value(v).is_err());

        assert!(EmbeddedMetadata::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn non_hex_hash_value_is_rejected() {
        let mut v = valid();
        v["integrity"]["payloadHash"]["value"] = json!("zz");
        assert!(matches!(
            EmbeddedMetadata::from_value(v),
            Err(ContainerError::MetadataInvalidShape(msg)) if msg.contains("payloadHash")
        ));
    }

    #[test]
    fn missing_signature_is_a_shape_error() {
        let mut v = valid();
        v["integrity"]
            .as_object_mut()
            .unwrap()
            .remove("payloadSignature");
        assert!(matches!(
            EmbeddedMetadata::from_value(v),
            Err(ContainerError::MetadataInvalidShape(msg)) if msg.contains("payloadSignature")
        ));
    }

    #[test]
    fn empty_signature_value_means_unsigned() {
        let mut v = valid();
        v["integrity"]["payloadSignature"] =
            json!({"alg": "harmonic-sig", "public": "phi", "value": ""});
        let meta = EmbeddedMetadata::from_value(v).unwrap();
        assert!(meta.integrity.payload_signature.is_unsigned());
    }

    #[test]
    fn signature_without_public_key_is_rejected() {
        let mut v = valid();
        v["integrity"]["payloadSignature"]["public"] = json!(" ");
        assert!(EmbeddedMetadata::from_value(v).is_err());
    }

    #[test]
    fn serializes_camel_case_with_unsigned_placeholder() {
        let mut meta = EmbeddedMetadata::from_value(valid()).unwrap();
        meta.integrity.payload_signature = PayloadSignature::unsigned("");
        let out = serde_json::to_value(&meta).unwrap();
        assert_eq!(out["integrity"]["payloadEncoding"], "gzip+base64");
        assert_eq!(
            out["integrity"]["payloadSignature"],
            json!({"alg": "harmonic-sig", "public": "", "value": ""})
        );
    }
}
