//! # Sigil Prover
//!
//! [`SigilProver`] wraps one [`ProverKeys`] set and exposes the wire-level
//! operations: hash a secret, prove membership, verify a proof.
//!
//! Proving fails fast, in this order:
//!
//! 1. an empty secret or expected hash is [`ZkError::MissingInput`];
//! 2. a secret whose native hash differs from the expected hash is
//!    [`ZkError::PublicInputMismatch`], checked before any proving work;
//! 3. a generated proof that does not verify against the prover's own key
//!    is [`ZkError::ProofVerificationFailed`].
//!
//! Proofs travel as base64 of the compressed arkworks serialization and
//! public signals as decimal strings.

use std::path::Path;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{PreparedVerifyingKey, Proof};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::circuit::MembershipCircuit;
use crate::error::ZkError;
use crate::field::{field_to_decimal, parse_field_decimal, secret_to_field};
use crate::keys::ProverKeys;
use crate::poseidon::{hash_field, PoseidonVersion};
use crate::traits::{Groth16Poseidon, ProofSystem, VerifyError};

/// Scheme label reported alongside proofs.
pub const SCHEME: &str = "groth16-poseidon";

/// A membership proof in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigilProof {
    /// Base64 of the compressed Groth16 proof.
    pub proof: String,
    /// Decimal public inputs. Always exactly one: the hash.
    pub public_signals: Vec<String>,
}

/// Hashes, proves and verifies against one key set.
#[derive(Debug)]
pub struct SigilProver {
    keys: ProverKeys,
}

impl SigilProver {
    pub fn new(keys: ProverKeys) -> Self {
        Self { keys }
    }

    /// Prover backed by the seeded setup for `version`.
    pub fn deterministic(version: PoseidonVersion) -> Result<Self, ZkError> {
        ProverKeys::deterministic(version).map(Self::new)
    }

    /// Prover backed by keys on disk.
    pub fn from_dir(dir: &Path, version: PoseidonVersion) -> Result<Self, ZkError> {
        ProverKeys::load(dir, version).map(Self::new)
    }

    pub fn version(&self) -> PoseidonVersion {
        self.keys.version()
    }

    pub fn keys(&self) -> &ProverKeys {
        &self.keys
    }

    /// Decimal hash of a secret under this prover's version.
    pub fn poseidon_hash(&self, secret: &str) -> Result<String, ZkError> {
        let x = secret_to_field(secret)?;
        Ok(field_to_decimal(&hash_field(self.version(), x)))
    }

    /// Prove knowledge of `secret` hashing to `expected_hash`.
    pub fn prove(&self, secret: &str, expected_hash: &str) -> Result<SigilProof, ZkError> {
        let started = Instant::now();
        if secret.trim().is_empty() {
            return Err(ZkError::MissingInput("secret"));
        }
        if expected_hash.trim().is_empty() {
            return Err(ZkError::MissingInput("expectedHash"));
        }
        let x = secret_to_field(secret)?;
        let expected = parse_field_decimal(expected_hash)?;
        let computed = hash_field(self.version(), x);
        if computed != expected {
            return Err(ZkError::PublicInputMismatch {
                expected: field_to_decimal(&expected),
                computed: field_to_decimal(&computed),
            });
        }

        let circuit = MembershipCircuit::new(self.version(), x, expected);
        let proof = Groth16Poseidon.prove(self.keys.proving_key(), &circuit)?;
        if !Groth16Poseidon.verify(self.keys.prepared_verifying_key(), &proof, &[expected])? {
            return Err(ZkError::ProofVerificationFailed);
        }

        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| ZkError::Encoding(format!("proof: {e}")))?;
        tracing::info!(
            version = %self.version(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated membership proof"
        );
        Ok(SigilProof {
            proof: BASE64.encode(bytes),
            public_signals: vec![field_to_decimal(&expected)],
        })
    }

    /// Verify a wire proof against this prover's key.
    pub fn verify(&self, public_signals: &[String], proof_b64: &str) -> Result<bool, VerifyError> {
        verify_proof(self.keys.prepared_verifying_key(), public_signals, proof_b64)
    }

    /// Prove and verify a fixed statement. Used by readiness checks and
    /// after loading external keys.
    pub fn self_check(&self) -> Result<(), ZkError> {
        let expected = self.poseidon_hash("1")?;
        let proof = self.prove("1", &expected)?;
        if self.verify(&proof.public_signals, &proof.proof)? {
            Ok(())
        } else {
            Err(ZkError::ProofVerificationFailed)
        }
    }
}

/// Verify a wire proof. A well-formed but false proof is `Ok(false)`;
/// only undecodable input is an error.
pub fn verify_proof(
    pvk: &PreparedVerifyingKey<Bn254>,
    public_signals: &[String],
    proof_b64: &str,
) -> Result<bool, VerifyError> {
    let bytes = BASE64
        .decode(proof_b64.trim())
        .map_err(|e| VerifyError::MalformedProof(format!("proof is not base64: {e}")))?;
    let proof = Proof::<Bn254>::deserialize_compressed(bytes.as_slice())
        .map_err(|e| VerifyError::MalformedProof(format!("proof bytes: {e}")))?;
    let inputs = public_signals
        .iter()
        .map(|s| parse_field_decimal(s).map_err(|e| VerifyError::MalformedProof(e.to_string())))
        .collect::<Result<Vec<Fr>, _>>()?;
    Groth16Poseidon.verify(pvk, &proof, &inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const H123: &str =
        "21311473666532118108347601749123208432833018918124551539574879208721651371919";
    const H456: &str =
        "13912148269862923444101156571246386501451252061574485053509774741240535258833";
    const H1: &str =
        "14571060324520842558257121652582619379257012270185255860565893720637957722560";
    const H2: &str =
        "14303987195845160025137533287396778840077440945490659432791983329321824362311";

    fn prover() -> SigilProver {
        SigilProver::deterministic(PoseidonVersion::V2).unwrap()
    }

    #[test]
    fn hashes_match_known_values() {
        let p = prover();
        assert_eq!(p.poseidon_hash("123").unwrap(), H123);
        assert_eq!(p.poseidon_hash(" 456 ").unwrap(), H456);
        assert_eq!(
            p.poseidon_hash("hello").unwrap(),
            "21539920976934165304138569583500420382010658486960401934574567534327802083806"
        );
    }

    #[test]
    fn distinct_secrets_give_distinct_valid_proofs() {
        let p = prover();
        let a = p.prove("123", H123).unwrap();
        let b = p.prove("456", H456).unwrap();
        assert_ne!(a.proof, b.proof);
        assert!(p.verify(&a.public_signals, &a.proof).unwrap());
        assert!(p.verify(&b.public_signals, &b.proof).unwrap());
    }

    #[test]
    fn public_signal_is_normalized_expected_hash() {
        let p = prover();
        let one = p.prove("1", &format!("000{H1}")).unwrap();
        let two = p.prove("2", H2).unwrap();
        assert_eq!(one.public_signals, vec![H1.to_string()]);
        assert_eq!(two.public_signals, vec![H2.to_string()]);
        assert_ne!(one.proof, two.proof);
        assert!(p.verify(&one.public_signals, &one.proof).unwrap());
        assert!(p.verify(&two.public_signals, &two.proof).unwrap());
    }

    #[test]
    fn unbound_expected_hash_is_rejected_before_proving() {
        let err = prover().prove("1", "1").unwrap_err();
        match err {
            ZkError::PublicInputMismatch { expected, computed } => {
                assert_eq!(expected, "1");
                assert_eq!(computed, H1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_inputs_are_missing() {
        let p = prover();
        assert!(matches!(
            p.prove("  ", H1),
            Err(ZkError::MissingInput("secret"))
        ));
        assert!(matches!(
            p.prove("1", ""),
            Err(ZkError::MissingInput("expectedHash"))
        ));
    }

    #[test]
    fn non_decimal_expected_hash_is_invalid() {
        let err = prover().prove("1", "0xabc").unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn proof_for_other_signal_verifies_false() {
        let p = prover();
        let a = p.prove("123", H123).unwrap();
        assert!(!p.verify(&[H456.to_string()], &a.proof).unwrap());
    }

    #[test]
    fn garbage_is_malformed_not_false() {
        let p = prover();
        assert!(matches!(
            p.verify(&[H1.to_string()], "not base64!"),
            Err(VerifyError::MalformedProof(_))
        ));
        assert!(matches!(
            p.verify(&[H1.to_string()], "AAAA"),
            Err(VerifyError::MalformedProof(_))
        ));
        let a = p.prove("1", H1).unwrap();
        assert!(matches!(
            p.verify(&["abc".to_string()], &a.proof),
            Err(VerifyError::MalformedProof(_))
        ));
    }

    #[test]
    fn proof_from_other_version_does_not_verify() {
        let v1 = SigilProver::deterministic(PoseidonVersion::V1).unwrap();
        let v2 = prover();
        let h = v1.poseidon_hash("9").unwrap();
        let proof = v1.prove("9", &h).unwrap();
        assert!(!v2.verify(&proof.public_signals, &proof.proof).unwrap());
    }

    #[test]
    fn self_check_passes() {
        prover().self_check().unwrap();
    }

    #[test]
    fn wire_form_is_camel_case() {
        let p = prover();
        let proof = p.prove("2", H2).unwrap();
        let json = serde_json::to_value(&proof).unwrap();
        assert!(json.get("publicSignals").is_some());
        let back: SigilProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }
}
