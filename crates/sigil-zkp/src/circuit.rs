//! R1CS statement: "I know `secret` such that `perm(secret)[0] == h`".
//!
//! `secret` is a private witness and `h` is the single public input. The
//! circuit shape depends only on the [`PoseidonVersion`], so one setup per
//! version serves every proof.

use ark_bn254::Fr;
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::poseidon::{permute_var, PoseidonVersion};

#[derive(Debug, Clone)]
pub struct MembershipCircuit {
    pub version: PoseidonVersion,
    pub secret: Option<Fr>,
    pub hash: Option<Fr>,
}

impl MembershipCircuit {
    /// Circuit with no assignment, used for key generation.
    pub fn blank(version: PoseidonVersion) -> Self {
        Self {
            version,
            secret: None,
            hash: None,
        }
    }

    pub fn new(version: PoseidonVersion, secret: Fr, hash: Fr) -> Self {
        Self {
            version,
            secret: Some(secret),
            hash: Some(hash),
        }
    }
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let h = FpVar::new_input(cs.clone(), || {
            self.hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let secret = FpVar::new_witness(cs, || {
            self.secret.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let out = permute_var(self.version.params(), &secret)?;
        out.enforce_equal(&h)
    }
}
