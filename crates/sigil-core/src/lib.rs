//! # sigil-core: Foundational Types for the Sigil Engine
//!
//! Every other crate in the workspace depends on `sigil-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One canonicalization primitive.** Every hash the sealer computes and
//!    every hash a verifier recomputes flows through [`canonical`]. Container
//!    integrity, lineage ids, ledger event ids, and prophecy hashes all share
//!    the same pipeline, so the two sides cannot drift apart.
//!
//! 2. **Domain-separated hashing.** [`domain_hash`] prefixes a short tag
//!    (`"SM:LINEAGE:1"`, `"SM-EVT-1"`, ...) before hashing, so payloads of
//!    unrelated kinds can never collide.
//!
//! 3. **Logical time.** [`KaiMoment`] replaces wall-clock timestamps for
//!    ordering and expiry. Step indices are always re-derived from the pulse
//!    via [`kai::step_index_from_pulse`], never trusted from storage.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sigil-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod kai;

pub use canonical::{
    canonicalize, domain_hash, domain_hash_serializable, finite_number, stable_stringify,
    CanonicalBytes,
};
pub use digest::{
    blake3_hex, compute_digest, sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm,
};
pub use error::{CodecError, KaiError};
pub use kai::{KaiCalendar, KaiMoment};
