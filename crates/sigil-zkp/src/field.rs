//! Conversions between wire strings and BN254 scalar field elements.
//!
//! Public signals travel as decimal strings. A secret is either a decimal
//! integer (reduced mod p) or an arbitrary string, which is hashed into the
//! field under a fixed domain so that the same text always yields the same
//! element.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::error::ZkError;

const SECRET_DOMAIN: &str = "sigil-zk/secret/v1:";

fn modulus() -> BigUint {
    BigUint::from_bytes_le(&Fr::MODULUS.to_bytes_le())
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn biguint_to_field(n: &BigUint) -> Fr {
    Fr::from_le_bytes_mod_order(&n.to_bytes_le())
}

/// Render a field element as a canonical decimal string.
pub fn field_to_decimal(x: &Fr) -> String {
    BigUint::from_bytes_le(&x.into_bigint().to_bytes_le()).to_string()
}

/// Map a trimmed secret to the field.
pub fn secret_to_field(secret: &str) -> Result<Fr, ZkError> {
    let s = secret.trim();
    if s.is_empty() {
        return Err(ZkError::MissingInput("secret"));
    }
    if is_decimal(s) {
        let n = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| ZkError::InvalidFieldElement(s.to_string()))?;
        return Ok(biguint_to_field(&n));
    }
    let digest = Sha256::digest(format!("{SECRET_DOMAIN}{s}").as_bytes());
    Ok(Fr::from_be_bytes_mod_order(&digest))
}

/// Parse a canonical decimal field element. Leading zeros are accepted and
/// normalized away; values at or above the modulus are rejected.
pub fn parse_field_decimal(s: &str) -> Result<Fr, ZkError> {
    let s = s.trim();
    if !is_decimal(s) {
        return Err(ZkError::InvalidFieldElement(format!(
            "{s:?} is not a decimal integer"
        )));
    }
    let n = BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| ZkError::InvalidFieldElement(s.to_string()))?;
    if n >= modulus() {
        return Err(ZkError::InvalidFieldElement(format!(
            "{s} exceeds the field modulus"
        )));
    }
    Ok(biguint_to_field(&n))
}

/// Normalize a decimal field element string (`"007"` becomes `"7"`).
pub fn normalize_decimal(s: &str) -> Result<String, ZkError> {
    parse_field_decimal(s).map(|x| field_to_decimal(&x))
}

/// Reduce a hex string (optionally `0x`-prefixed) into the field.
/// An empty string maps to zero.
pub fn hex_to_field(hex_str: &str) -> Result<Fr, ZkError> {
    let s = hex_str.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.is_empty() {
        return Ok(Fr::from(0u64));
    }
    let n = BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| ZkError::InvalidFieldElement(format!("{hex_str:?} is not hex")))?;
    Ok(biguint_to_field(&n))
}
