//! # Versioned Poseidon-Style Permutation
//!
//! A width-2 permutation over the BN254 scalar field. The state starts as
//! `(x, 0)` and the hash is lane 0 after all rounds. Each round adds the
//! round constants, applies the `x⁵` S-box (both lanes in a full round,
//! lane 0 only in a partial round), then multiplies by the MDS matrix.
//!
//! | Version | Rounds | Constants | MDS |
//! |---|---|---|---|
//! | `sigil-poseidon-v1` | 8 full | `(2r+1, 2r+2)` | `[[1,2],[3,4]]` |
//! | `sigil-poseidon-v2` | 4 full, 56 partial, 4 full | `SHA-256("sigil-poseidon-v2/rc/{r}/{i}")` mod p | Cauchy `[[1/2,1/3],[1/3,1/4]]` |
//!
//! V1 reproduces the hash carried by existing artifacts. V2 is the default
//! for new proofs. The native and in-circuit implementations share one
//! parameter set, so prover and verifier cannot disagree.

use std::str::FromStr;
use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_ff::{Field, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::SynthesisError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Selects the permutation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PoseidonVersion {
    #[serde(rename = "sigil-poseidon-v1")]
    V1,
    #[default]
    #[serde(rename = "sigil-poseidon-v2")]
    V2,
}

impl PoseidonVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "sigil-poseidon-v1",
            Self::V2 => "sigil-poseidon-v2",
        }
    }

    /// Parameters for this version, built once per process.
    pub fn params(&self) -> &'static PoseidonParams {
        static V1: OnceLock<PoseidonParams> = OnceLock::new();
        static V2: OnceLock<PoseidonParams> = OnceLock::new();
        match self {
            Self::V1 => V1.get_or_init(PoseidonParams::v1),
            Self::V2 => V2.get_or_init(PoseidonParams::v2),
        }
    }
}

impl std::fmt::Display for PoseidonVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoseidonVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "sigil-poseidon-v1" => Ok(Self::V1),
            "v2" | "2" | "sigil-poseidon-v2" => Ok(Self::V2),
            other => Err(format!("unknown hash version: {other}")),
        }
    }
}

/// Round structure and constants of one permutation version.
#[derive(Debug, Clone)]
pub struct PoseidonParams {
    full_rounds_begin: usize,
    partial_rounds: usize,
    full_rounds_end: usize,
    round_constants: Vec<[Fr; 2]>,
    mds: [[Fr; 2]; 2],
}

impl PoseidonParams {
    fn v1() -> Self {
        let round_constants = (0..8u64)
            .map(|r| [Fr::from(2 * r + 1), Fr::from(2 * r + 2)])
            .collect();
        Self {
            full_rounds_begin: 8,
            partial_rounds: 0,
            full_rounds_end: 0,
            round_constants,
            mds: [
                [Fr::from(1u64), Fr::from(2u64)],
                [Fr::from(3u64), Fr::from(4u64)],
            ],
        }
    }

    fn v2() -> Self {
        const FULL_HALF: usize = 4;
        const PARTIAL: usize = 56;
        let rounds = 2 * FULL_HALF + PARTIAL;
        let round_constants = (0..rounds)
            .map(|r| [v2_constant(r, 0), v2_constant(r, 1)])
            .collect();
        Self {
            full_rounds_begin: FULL_HALF,
            partial_rounds: PARTIAL,
            full_rounds_end: FULL_HALF,
            round_constants,
            mds: [
                [inverse_of(2), inverse_of(3)],
                [inverse_of(3), inverse_of(4)],
            ],
        }
    }

    pub fn rounds(&self) -> usize {
        self.full_rounds_begin + self.partial_rounds + self.full_rounds_end
    }

    pub fn is_full_round(&self, round: usize) -> bool {
        round < self.full_rounds_begin || round >= self.full_rounds_begin + self.partial_rounds
    }
}

fn v2_constant(round: usize, lane: usize) -> Fr {
    let digest = Sha256::digest(format!("sigil-poseidon-v2/rc/{round}/{lane}").as_bytes());
    Fr::from_be_bytes_mod_order(&digest)
}

fn inverse_of(n: u64) -> Fr {
    // n is a small non-zero constant, so the inverse always exists.
    Fr::from(n).inverse().unwrap_or_default()
}

fn sbox(x: Fr) -> Fr {
    let x2 = x.square();
    x2.square() * x
}

/// Run the permutation on `(x, 0)` and return lane 0.
pub fn permute(params: &PoseidonParams, x: Fr) -> Fr {
    let mut s = [x, Fr::from(0u64)];
    let m = &params.mds;
    for (r, rc) in params.round_constants.iter().enumerate() {
        s[0] += rc[0];
        s[1] += rc[1];
        s[0] = sbox(s[0]);
        if params.is_full_round(r) {
            s[1] = sbox(s[1]);
        }
        s = [
            m[0][0] * s[0] + m[0][1] * s[1],
            m[1][0] * s[0] + m[1][1] * s[1],
        ];
    }
    s[0]
}

/// Hash a field element with the given version.
pub fn hash_field(version: PoseidonVersion, x: Fr) -> Fr {
    permute(version.params(), x)
}

fn sbox_var(x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let x2 = x.square()?;
    let x4 = x2.square()?;
    Ok(&x4 * x)
}

/// In-circuit permutation. Constrains exactly what [`permute`] computes.
pub fn permute_var(params: &PoseidonParams, x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let mut s0 = x.clone();
    let mut s1 = FpVar::<Fr>::zero();
    let m = &params.mds;
    for (r, rc) in params.round_constants.iter().enumerate() {
        s0 = &s0 + rc[0];
        s1 = &s1 + rc[1];
        s0 = sbox_var(&s0)?;
        if params.is_full_round(r) {
            s1 = sbox_var(&s1)?;
        }
        let n0 = &s0 * m[0][0] + &s1 * m[0][1];
        let n1 = &s0 * m[1][0] + &s1 * m[1][1];
        s0 = n0;
        s1 = n1;
    }
    Ok(s0)
}
