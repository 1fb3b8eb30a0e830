//! # Phi Keys
//!
//! A phi key is the user-facing identity bound to a Kai signature:
//! `base58check(0x00 || SHA-256(kaiSignature || "φ")[..20])`.
//! Verifiers re-derive it from the embedded signature and compare; an
//! embedded phi key is never trusted on its own.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

const PHI_SUFFIX: &str = "φ";
const VERSION: u8 = 0x00;
const PAYLOAD_LEN: usize = 20;

/// A base58check-encoded phi key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhiKey(String);

impl PhiKey {
    /// Parse and checksum-verify a phi key.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        let decoded = bs58::decode(s)
            .with_check(Some(VERSION))
            .into_vec()
            .map_err(|e| CryptoError::InvalidPhiKey(e.to_string()))?;
        // `decoded` keeps the version byte.
        if decoded.len() != PAYLOAD_LEN + 1 {
            return Err(CryptoError::InvalidPhiKey(format!(
                "expected {PAYLOAD_LEN}-byte payload, got {}",
                decoded.len().saturating_sub(1)
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhiKey {
    type Error = CryptoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PhiKey> for String {
    fn from(k: PhiKey) -> Self {
        k.0
    }
}

/// Derive the phi key bound to a Kai signature.
pub fn derive_phi_key(kai_signature: &str) -> PhiKey {
    let mut hasher = Sha256::new();
    hasher.update(kai_signature.as_bytes());
    hasher.update(PHI_SUFFIX.as_bytes());
    let digest = hasher.finalize();
    let encoded = bs58::encode(&digest[..PAYLOAD_LEN])
        .with_check_version(VERSION)
        .into_string();
    PhiKey(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(
            derive_phi_key("sig-test-1").as_str(),
            "1NHVPz3j4wArBdsTSdRqyQA95rwKj3oCY4"
        );
        assert_eq!(
            derive_phi_key("abc").as_str(),
            "1CJDjtHnrCrZseqMgBV8LASNHPKuQYk8rU"
        );
    }

    #[test]
    fn derived_keys_parse() {
        let k = derive_phi_key("sig-root");
        assert_eq!(PhiKey::parse(k.as_str()).unwrap(), k);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut s = derive_phi_key("abc").to_string();
        s.pop();
        s.push('z');
        assert!(matches!(PhiKey::parse(&s), Err(CryptoError::InvalidPhiKey(_))));
        assert!(PhiKey::parse("0OIl").is_err());
    }

    #[test]
    fn serde_validates_on_read() {
        let k = derive_phi_key("abc");
        let json = serde_json::to_string(&k).unwrap();
        assert_eq!(json, "\"1CJDjtHnrCrZseqMgBV8LASNHPKuQYk8rU\"");
        assert_eq!(serde_json::from_str::<PhiKey>(&json).unwrap(), k);
        assert!(serde_json::from_str::<PhiKey>("\"nope\"").is_err());
    }
}
