//! # sigil-crypto: Identity & Signing Primitives
//!
//! - [`ed25519`]: signatures over container payload hashes.
//! - [`phikey`]: the base58check identity key derived from a Kai signature.
//! - [`kai_signature`]: the deterministic per-pulse Kai signature.
//!
//! Private keys never implement `Serialize` and their `Debug` output is
//! redacted.

pub mod ed25519;
pub mod error;
pub mod kai_signature;
pub mod phikey;

pub use ed25519::{verify_digest, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use kai_signature::{kai_signature, SYSTEM_INTENTION};
pub use phikey::{derive_phi_key, PhiKey};
