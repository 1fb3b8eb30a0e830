//! # sigil-zkp: Membership Proofs
//!
//! Proves knowledge of a `secret` whose permutation hash equals a public
//! commitment `h`, without revealing the secret.
//!
//! ## Layers
//!
//! - [`poseidon`]: the versioned width-2 permutation, native and in-circuit.
//! - [`field`]: decimal/hex/string conversions into the BN254 scalar field.
//! - [`circuit`]: the R1CS statement `perm(secret)[0] == h`.
//! - [`traits`]: the sealed [`ProofSystem`] seam and its Groth16 backend.
//! - [`keys`]: deterministic per-version setup, plus import/export so
//!   ceremony keys can replace it.
//! - [`groth16`]: [`SigilProver`], which ties hashing, proving, and
//!   verification together with the fast-fail input checks.
//! - [`stamp`]: per-payload ZK stamps derived from a payload hash.
//! - [`remote`]: bounded-timeout external verification with local fallback.
//!
//! ## Error taxonomy
//!
//! `MissingInput` and `PublicInputMismatch` are caller bugs.
//! `ProofVerificationFailed` is the only error safe to show generically.

pub mod circuit;
pub mod error;
pub mod field;
pub mod groth16;
pub mod keys;
pub mod poseidon;
pub mod remote;
pub mod stamp;
pub mod traits;

pub use error::ZkError;
pub use groth16::{verify_proof, SigilProof, SigilProver};
pub use keys::ProverKeys;
pub use poseidon::PoseidonVersion;
pub use remote::{verify_with_fallback, VerificationOutcome, VerificationSource};
pub use stamp::{zk_stamp, ZkStamp};
pub use traits::{Groth16Poseidon, ProofError, ProofSystem, VerifyError};
