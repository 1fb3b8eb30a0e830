//! # Content Digest
//!
//! Algorithm-tagged digests. Container integrity blocks carry the algorithm
//! name next to the hex value (`{"alg": "blake3", "value": "..."}`), so the
//! tag and the bytes always travel together.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
    /// BLAKE3 with the default 32-byte output.
    Blake3,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!("unsupported digest algorithm: {other}")),
        }
    }
}

/// A digest together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(algorithm: DigestAlgorithm, hex_str: &str) -> Result<Self, String> {
        let raw = hex::decode(hex_str.trim()).map_err(|e| format!("invalid digest hex: {e}"))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|v: Vec<u8>| format!("digest must be 32 bytes, got {}", v.len()))?;
        Ok(Self { algorithm, bytes })
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Hash raw bytes with the chosen algorithm.
pub fn compute_digest(algorithm: DigestAlgorithm, data: &[u8]) -> ContentDigest {
    let mut bytes = [0u8; 32];
    match algorithm {
        DigestAlgorithm::Sha256 => bytes.copy_from_slice(&Sha256::digest(data)),
        DigestAlgorithm::Blake3 => bytes = *blake3::hash(data).as_bytes(),
    }
    ContentDigest::new(algorithm, bytes)
}

/// SHA-256 digest of canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    compute_digest(DigestAlgorithm::Sha256, data.as_bytes())
}

/// Lowercase SHA-256 hex of raw bytes, used for document-level hashes
/// such as an SVG's `svgHash`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Lowercase BLAKE3 hex of raw bytes.
pub fn blake3_hex(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
