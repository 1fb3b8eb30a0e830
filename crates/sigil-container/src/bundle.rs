//! # Proof Bundles
//!
//! A proof bundle is a JSON object embedded in its own
//! `<metadata id="sigil-proof-bundle">` block. It records `svgHash`, the
//! hash of the document it lives in, so that hash is taken over the
//! document with the bundle block removed ([`canonical_svg_hash`]).
//!
//! `bundleHash` covers the bundle itself with `bundleHash` and any
//! `receiveSig` dropped and `authorSig` nulled, so author and receiver
//! signatures can be attached after hashing.

use serde::Serialize;
use serde_json::Value;
use sigil_core::{sha256_hex, stable_stringify};

use crate::embed::{embed_block, remove_block};
use crate::error::ContainerError;
use crate::scan::{self, Tag};

/// `id` of the metadata block holding the proof bundle.
pub const PROOF_BUNDLE_ID: &str = "sigil-proof-bundle";

/// SHA-256 hex of the document with any proof-bundle block removed.
pub fn canonical_svg_hash(document: &str) -> String {
    sha256_hex(remove_block(document, PROOF_BUNDLE_ID).as_bytes())
}

fn require_object(bundle: &Value) -> Result<&serde_json::Map<String, Value>, ContainerError> {
    bundle.as_object().ok_or_else(|| {
        ContainerError::MetadataInvalidShape("proof bundle must be a JSON object".to_string())
    })
}

/// Hash of the unsigned form of a bundle.
pub fn bundle_hash(bundle: &Value) -> Result<String, ContainerError> {
    let mut unsigned = require_object(bundle)?.clone();
    unsigned.remove("bundleHash");
    unsigned.remove("receiveSig");
    unsigned.insert("authorSig".to_string(), Value::Null);
    let canonical = stable_stringify(&Value::Object(unsigned))?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Embed a bundle object as-is.
pub fn embed_proof_bundle(document: &str, bundle: &Value) -> Result<String, ContainerError> {
    require_object(bundle)?;
    embed_block(document, PROOF_BUNDLE_ID, &stable_stringify(bundle)?)
}

/// Set `svgHash` and `bundleHash` on `bundle`, then embed it.
pub fn stamp_proof_bundle(
    document: &str,
    bundle: &Value,
) -> Result<(String, Value), ContainerError> {
    let mut stamped = require_object(bundle)?.clone();
    stamped.insert(
        "svgHash".to_string(),
        Value::String(canonical_svg_hash(document)),
    );
    let hash = bundle_hash(&Value::Object(stamped.clone()))?;
    stamped.insert("bundleHash".to_string(), Value::String(hash));
    let stamped = Value::Object(stamped);
    Ok((embed_proof_bundle(document, &stamped)?, stamped))
}

/// The embedded proof bundle.
pub fn extract_proof_bundle(document: &str) -> Result<Value, ContainerError> {
    let block = scan::candidates(document, Tag::Metadata, Some(PROOF_BUNDLE_ID))
        .into_iter()
        .find(|e| e.id.as_deref() == Some(PROOF_BUNDLE_ID))
        .ok_or(ContainerError::MetadataMissing)?;
    scan::outermost_json_objects(&block.text)
        .into_iter()
        .find_map(|chunk| serde_json::from_str::<Value>(chunk).ok())
        .ok_or_else(|| ContainerError::MetadataNotJson("proof bundle block".to_string()))
}

/// Which bundle hashes still match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleCheck {
    pub svg_hash_ok: bool,
    pub bundle_hash_ok: bool,
}

impl BundleCheck {
    pub fn ok(&self) -> bool {
        self.svg_hash_ok && self.bundle_hash_ok
    }
}

/// Recompute both hashes of the embedded bundle.
pub fn verify_proof_bundle(document: &str) -> Result<BundleCheck, ContainerError> {
    let bundle = extract_proof_bundle(document)?;
    let declared = |key: &str| bundle.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(BundleCheck {
        svg_hash_ok: declared("svgHash").as_deref() == Some(canonical_svg_hash(document).as_str()),
        bundle_hash_ok: declared("bundleHash").as_deref() == Some(bundle_hash(&bundle)?.as_str()),
    })
}
