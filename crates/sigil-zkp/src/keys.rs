//! # Groth16 Keys
//!
//! Each [`PoseidonVersion`] has its own circuit and therefore its own key
//! pair. [`ProverKeys::deterministic`] runs the setup with an RNG seeded
//! from `SHA-256("sigil-zk/groth16-setup/{version}")`, so every process
//! derives the same verifying key without shipping key files.
//!
//! Anyone who knows the seed can recompute the setup trapdoor. Production
//! deployments replace these keys with ceremony output through
//! [`ProverKeys::load`]; [`ProverKeys::save`] writes the same layout.

use std::path::Path;

use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::circuit::MembershipCircuit;
use crate::error::ZkError;
use crate::poseidon::PoseidonVersion;

pub const PROVING_KEY_FILE: &str = "proving_key.bin";
pub const VERIFYING_KEY_FILE: &str = "verifying_key.bin";

/// Proving and verifying keys for one permutation version.
pub struct ProverKeys {
    version: PoseidonVersion,
    pk: ProvingKey<Bn254>,
    vk: VerifyingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl ProverKeys {
    /// Run the seeded setup for `version`.
    pub fn deterministic(version: PoseidonVersion) -> Result<Self, ZkError> {
        let seed: [u8; 32] =
            Sha256::digest(format!("sigil-zk/groth16-setup/{version}").as_bytes()).into();
        let mut rng = StdRng::from_seed(seed);
        let (pk, vk) =
            Groth16::<Bn254>::circuit_specific_setup(MembershipCircuit::blank(version), &mut rng)
                .map_err(|e| ZkError::Encoding(format!("setup failed: {e}")))?;
        Self::from_parts(version, pk, vk)
    }

    fn from_parts(
        version: PoseidonVersion,
        pk: ProvingKey<Bn254>,
        vk: VerifyingKey<Bn254>,
    ) -> Result<Self, ZkError> {
        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| ZkError::Encoding(format!("verifying key preparation failed: {e}")))?;
        Ok(Self {
            version,
            pk,
            vk,
            pvk,
        })
    }

    /// Load keys written by [`ProverKeys::save`] or an external ceremony.
    pub fn load(dir: &Path, version: PoseidonVersion) -> Result<Self, ZkError> {
        let pk_bytes = std::fs::read(dir.join(PROVING_KEY_FILE))?;
        let vk_bytes = std::fs::read(dir.join(VERIFYING_KEY_FILE))?;
        let pk = ProvingKey::<Bn254>::deserialize_compressed(pk_bytes.as_slice())
            .map_err(|e| ZkError::Encoding(format!("proving key: {e}")))?;
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes.as_slice())
            .map_err(|e| ZkError::Encoding(format!("verifying key: {e}")))?;
        tracing::info!(dir = %dir.display(), %version, "loaded groth16 keys");
        Self::from_parts(version, pk, vk)
    }

    /// Write both keys in compressed form.
    pub fn save(&self, dir: &Path) -> Result<(), ZkError> {
        std::fs::create_dir_all(dir)?;
        let mut pk_bytes = Vec::new();
        self.pk
            .serialize_compressed(&mut pk_bytes)
            .map_err(|e| ZkError::Encoding(format!("proving key: {e}")))?;
        std::fs::write(dir.join(PROVING_KEY_FILE), pk_bytes)?;
        std::fs::write(dir.join(VERIFYING_KEY_FILE), self.verifying_key_bytes()?)?;
        Ok(())
    }

    pub fn version(&self) -> PoseidonVersion {
        self.version
    }

    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.pk
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.vk
    }

    pub fn prepared_verifying_key(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.pvk
    }

    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>, ZkError> {
        let mut out = Vec::new();
        self.vk
            .serialize_compressed(&mut out)
            .map_err(|e| ZkError::Encoding(format!("verifying key: {e}")))?;
        Ok(out)
    }

    /// SHA-256 hex of the compressed verifying key.
    pub fn fingerprint(&self) -> Result<String, ZkError> {
        Ok(hex::encode(Sha256::digest(self.verifying_key_bytes()?)))
    }
}

impl std::fmt::Debug for ProverKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProverKeys")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_setup_is_reproducible() {
        let a = ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        let b = ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn versions_have_distinct_keys() {
        let a = ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        let b = ProverKeys::deterministic(PoseidonVersion::V2).unwrap();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn save_and_load_preserve_verifying_key() {
        let dir = tempfile::tempdir().unwrap();
        let keys = ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        keys.save(dir.path()).unwrap();
        let loaded = ProverKeys::load(dir.path(), PoseidonVersion::V1).unwrap();
        assert_eq!(keys.fingerprint().unwrap(), loaded.fingerprint().unwrap());
        assert_eq!(loaded.version(), PoseidonVersion::V1);
    }

    #[test]
    fn load_from_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProverKeys::load(&dir.path().join("absent"), PoseidonVersion::V2).unwrap_err();
        assert!(matches!(err, ZkError::Io(_)));
    }

    #[test]
    fn corrupt_key_file_is_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROVING_KEY_FILE), b"junk").unwrap();
        std::fs::write(dir.path().join(VERIFYING_KEY_FILE), b"junk").unwrap();
        let err = ProverKeys::load(dir.path(), PoseidonVersion::V2).unwrap_err();
        assert!(matches!(err, ZkError::Encoding(_)));
    }

    #[test]
    fn debug_omits_key_material() {
        let keys = ProverKeys::deterministic(PoseidonVersion::V1).unwrap();
        let dbg = format!("{keys:?}");
        assert!(dbg.contains("V1"));
        assert!(!dbg.contains("alpha"));
    }
}
