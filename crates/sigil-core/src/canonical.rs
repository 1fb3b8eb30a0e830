//! # Canonical Payload Codec
//!
//! The single canonicalization and hashing primitive for the Sigil engine.
//!
//! ## Pipeline
//!
//! 1. [`canonicalize`] walks the JSON tree. It sorts object keys and recurses
//!    into arrays and objects. It rejects non-finite numbers
//!    (`InvalidNumber`) and trees nested deeper than [`MAX_DEPTH`]
//!    (`InvalidShape`). An owned `serde_json::Value` cannot contain a cycle,
//!    so the depth bound is what rejects runaway recursive structures;
//!    nothing is ever silently truncated.
//! 2. [`stable_stringify`] serializes the canonical tree with `serde_jcs`
//!    (RFC 8785). The output is compact with sorted keys and JSON-escaped
//!    strings, and numbers use the ECMAScript shortest round-trip rendering
//!    (`1.0` becomes `1`, `0.5` stays `0.5`).
//! 3. [`domain_hash`] returns lowercase hex
//!    `SHA-256(tag || ":" || stable_stringify(value))`.
//!
//! Unlike integer-only canonical forms, finite floats are accepted: Kai
//! payloads carry fractional fields such as `stepPct`.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::error::CodecError;

/// Maximum nesting depth accepted by [`canonicalize`].
pub const MAX_DEPTH: usize = 128;

/// Bytes produced exclusively by the canonical pipeline.
///
/// The inner buffer is private; [`CanonicalBytes::new`] and
/// [`CanonicalBytes::from_value`] are the only constructors, so anything
/// holding `CanonicalBytes` was canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `InvalidShape` if the value does not convert to JSON (for example a
    /// map with non-string keys), otherwise whatever [`canonicalize`] reports.
    pub fn new(obj: &impl Serialize) -> Result<Self, CodecError> {
        let value =
            serde_json::to_value(obj).map_err(|e| CodecError::InvalidShape(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Canonicalize an existing JSON tree.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        Ok(Self(stable_stringify(value)?.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical text. JCS output is always valid UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the wrapper and return the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively canonicalize a JSON value.
///
/// Pure and idempotent: `canonicalize(canonicalize(v)) == canonicalize(v)`.
pub fn canonicalize(value: &Value) -> Result<Value, CodecError> {
    canonicalize_at(value, 0)
}

fn canonicalize_at(value: &Value, depth: usize) -> Result<Value, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::InvalidShape(format!(
            "nesting exceeds {MAX_DEPTH} levels"
        )));
    }
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value.clone()),
        Value::Number(n) => {
            check_number(n)?;
            Ok(value.clone())
        }
        Value::Array(items) => items
            .iter()
            .map(|v| canonicalize_at(v, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (k, v) in entries {
                out.insert(k.clone(), canonicalize_at(v, depth + 1)?);
            }
            Ok(Value::Object(out))
        }
    }
}

fn check_number(n: &Number) -> Result<(), CodecError> {
    if n.is_f64() {
        match n.as_f64() {
            Some(f) if f.is_finite() => {}
            _ => return Err(CodecError::InvalidNumber(n.to_string())),
        }
    }
    Ok(())
}

/// Build a JSON number from an `f64`, failing closed on NaN and infinities.
///
/// `serde_json` maps non-finite floats to `null` when serializing, which
/// would silently change a payload's hash. Callers holding raw floats go
/// through this helper instead.
pub fn finite_number(x: f64) -> Result<Value, CodecError> {
    if !x.is_finite() {
        return Err(CodecError::InvalidNumber(x.to_string()));
    }
    Number::from_f64(x)
        .map(Value::Number)
        .ok_or_else(|| CodecError::InvalidNumber(x.to_string()))
}

/// Serialize a value in canonical form.
pub fn stable_stringify(value: &Value) -> Result<String, CodecError> {
    let canonical = canonicalize(value)?;
    Ok(serde_jcs::to_string(&canonical)?)
}

/// Domain-separated canonical hash: lowercase hex
/// `SHA-256(tag || ":" || stable_stringify(value))`.
pub fn domain_hash(value: &Value, domain_tag: &str) -> Result<String, CodecError> {
    let body = stable_stringify(value)?;
    let mut hasher = Sha256::new();
    hasher.update(domain_tag.as_bytes());
    hasher.update(b":");
    hasher.update(body.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// [`domain_hash`] over any serializable value.
pub fn domain_hash_serializable(
    obj: &impl Serialize,
    domain_tag: &str,
) -> Result<String, CodecError> {
    let value = serde_json::to_value(obj).map_err(|e| CodecError::InvalidShape(e.to_string()))?;
    domain_hash(&value, domain_tag)
}
