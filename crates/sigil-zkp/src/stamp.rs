//! Per-payload ZK stamps.
//!
//! A stamp binds a payload to the membership scheme without a proof: the
//! payload hash (hex) is reduced into the field to form the secret, and the
//! stamp hash is that secret's permutation hash. Anyone holding the payload
//! can recompute both and later prove membership with [`crate::SigilProver`].

use serde::{Deserialize, Serialize};

use crate::error::ZkError;
use crate::field::{field_to_decimal, hex_to_field};
use crate::poseidon::{hash_field, PoseidonVersion};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkStamp {
    /// Decimal field element derived from the payload hash.
    pub secret: String,
    /// Decimal permutation hash of `secret`.
    pub hash: String,
    pub version: PoseidonVersion,
}

pub fn zk_stamp(payload_hash_hex: &str, version: PoseidonVersion) -> Result<ZkStamp, ZkError> {
    let secret = hex_to_field(payload_hash_hex)?;
    Ok(ZkStamp {
        secret: field_to_decimal(&secret),
        hash: field_to_decimal(&hash_field(version, secret)),
        version,
    })
}
