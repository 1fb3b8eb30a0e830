//! # Proof System Trait (Sealed)
//!
//! The seam between the proving logic and a concrete SNARK backend. The
//! trait is sealed: only backends defined in this crate can implement it,
//! so no external crate can inject a proof system whose verifier accepts
//! forged proofs.
//!
//! [`Groth16Poseidon`] is the one backend: Groth16 over BN254 for the
//! [`MembershipCircuit`].

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey};
use ark_snark::SNARK;
use thiserror::Error;

use crate::circuit::MembershipCircuit;

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The circuit inputs are invalid or missing.
    #[error("invalid circuit inputs: {0}")]
    InvalidInputs(String),
    /// Proof generation failed internally.
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
}

/// Error during proof verification.
///
/// A well-formed but false proof is not an error; it verifies to `false`.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof or public inputs could not be decoded.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The verifier itself failed.
    #[error("verifier failure: {0}")]
    VerifierFailure(String),
}

mod private {
    pub trait Sealed {}
}

/// Sealed interface for a zero-knowledge proof system.
pub trait ProofSystem: private::Sealed + Send + Sync {
    type Proof: Clone + std::fmt::Debug;
    type VerifyingKey: Clone;
    type ProvingKey;
    type Circuit: Clone;
    type PublicInput;

    /// Generate a proof for a fully assigned circuit.
    fn prove(
        &self,
        pk: &Self::ProvingKey,
        circuit: &Self::Circuit,
    ) -> Result<Self::Proof, ProofError>;

    /// Verify a proof. `Ok(false)` means well-formed but false.
    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &[Self::PublicInput],
    ) -> Result<bool, VerifyError>;
}

/// Groth16 over BN254 for the membership circuit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Groth16Poseidon;

impl private::Sealed for Groth16Poseidon {}

impl ProofSystem for Groth16Poseidon {
    type Proof = Proof<Bn254>;
    type VerifyingKey = PreparedVerifyingKey<Bn254>;
    type ProvingKey = ProvingKey<Bn254>;
    type Circuit = MembershipCircuit;
    type PublicInput = Fr;

    fn prove(
        &self,
        pk: &Self::ProvingKey,
        circuit: &Self::Circuit,
    ) -> Result<Self::Proof, ProofError> {
        if circuit.secret.is_none() || circuit.hash.is_none() {
            return Err(ProofError::InvalidInputs(
                "circuit must carry both secret and hash".to_string(),
            ));
        }
        let mut rng = rand::rngs::OsRng;
        Groth16::<Bn254>::prove(pk, circuit.clone(), &mut rng)
            .map_err(|e| ProofError::GenerationFailed(e.to_string()))
    }

    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &[Self::PublicInput],
    ) -> Result<bool, VerifyError> {
        if public_inputs.len() != 1 {
            return Err(VerifyError::MalformedProof(format!(
                "expected 1 public input, got {}",
                public_inputs.len()
            )));
        }
        Groth16::<Bn254>::verify_with_processed_vk(vk, public_inputs, proof)
            .map_err(|e| VerifyError::VerifierFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poseidon::PoseidonVersion;

    #[test]
    fn blank_circuit_is_rejected_before_proving() {
        let keys = crate::keys::ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        let err = Groth16Poseidon
            .prove(keys.proving_key(), &MembershipCircuit::blank(PoseidonVersion::V1))
            .unwrap_err();
        assert!(matches!(err, ProofError::InvalidInputs(_)));
    }

    #[test]
    fn verify_requires_exactly_one_input() {
        let keys = crate::keys::ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        let x = Fr::from(3u64);
        let h = crate::poseidon::hash_field(PoseidonVersion::V1, x);
        let circuit = MembershipCircuit::new(PoseidonVersion::V1, x, h);
        let proof = Groth16Poseidon.prove(keys.proving_key(), &circuit).unwrap();
        let vk = keys.prepared_verifying_key();

        assert!(Groth16Poseidon.verify(vk, &proof, &[h]).unwrap());
        assert!(matches!(
            Groth16Poseidon.verify(vk, &proof, &[]),
            Err(VerifyError::MalformedProof(_))
        ));
        assert!(matches!(
            Groth16Poseidon.verify(vk, &proof, &[h, h]),
            Err(VerifyError::MalformedProof(_))
        ));
    }
}
