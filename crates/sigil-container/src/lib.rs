//! # sigil-container: The Sigil Container Format
//!
//! A sigil is an SVG document carrying a signed, compressed JSON payload in
//! a `<metadata id="sigil-container">` block:
//!
//! - [`scan`]: tolerant element and JSON location (structural tokenizer
//!   with a regex fallback, outermost-object brace matching).
//! - [`metadata`]: the typed container shape.
//! - [`extract`] / [`embed`]: reading and writing blocks.
//! - [`integrity`]: sealing and opening payloads (hash first, then
//!   signature).
//! - [`bundle`]: proof bundles and the bundle-independent SVG hash.

pub mod bundle;
pub mod codec;
pub mod embed;
pub mod error;
pub mod extract;
pub mod integrity;
pub mod metadata;
pub mod scan;

pub use bundle::{
    bundle_hash, canonical_svg_hash, embed_proof_bundle, extract_proof_bundle, stamp_proof_bundle,
    verify_proof_bundle, BundleCheck, PROOF_BUNDLE_ID,
};
pub use embed::embed;
pub use error::ContainerError;
pub use extract::{
    embedded_json_objects, extract, extract_embedded_json, CONTAINER_BLOCK_ID,
};
pub use integrity::{open, seal, OpenedContainer, PayloadSigner, SignatureStatus};
pub use metadata::{EmbeddedMetadata, PayloadSignature, SignatureAlgorithm};

/// Extract the container from `document` and open it.
pub fn extract_and_open(document: &str) -> Result<OpenedContainer, ContainerError> {
    open(&extract(document)?)
}
