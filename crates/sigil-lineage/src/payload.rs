//! Claim payloads for resolved positions.
//!
//! Amounts are micro-units carried as `u128` and serialized as decimal
//! strings, so they survive JSON consumers that only have doubles.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sigil_core::{CodecError, KaiMoment};

use crate::derive::{derive_lineage_id, LineageContext};

pub const CLAIM_PAYLOAD_VERSION: &str = "SM-CLAIM-1";

/// An amount in micro-units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MicroAmount(pub u128);

impl MicroAmount {
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for MicroAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MicroAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for MicroAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MicroVisitor;

        impl Visitor<'_> for MicroVisitor {
            type Value = MicroAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(MicroAmount(u128::from(v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let v = v.trim();
                if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(E::custom(format!("invalid micro amount {v:?}")));
                }
                v.parse::<u128>().map(MicroAmount).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MicroVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketSide {
    Yes,
    No,
}

impl MarketSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Won,
    Lost,
    Refunded,
    Claimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntry {
    pub side: MarketSide,
    pub stake_micro: MicroAmount,
    pub shares_micro: MicroAmount,
    pub opened_at: KaiMoment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub outcome: MarketSide,
    pub resolved_pulse: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub market_id: String,
    pub entry: PositionEntry,
    pub status: PositionStatus,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl Position {
    /// Lost by status, or by a resolution against the entry side.
    pub fn is_lost(&self) -> bool {
        self.status == PositionStatus::Lost
            || self
                .resolution
                .as_ref()
                .is_some_and(|r| r.outcome != self.entry.side)
    }
}

/// Identity of the vault that holds a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultOwner {
    pub user_phi_key: String,
    pub kai_signature: String,
    /// Canonical hash of the owner's identity sigil; the lineage root.
    pub identity_svg_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayload {
    pub v: String,
    pub kind: String,
    pub position_id: String,
    pub market_id: String,
    pub side: MarketSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MarketSide>,
    pub status: PositionStatus,
    pub stake_micro: MicroAmount,
    pub payout_phi_micro: MicroAmount,
    pub user_phi_key: String,
    pub kai_signature: String,
    pub lineage_root_svg_hash: String,
    pub lineage_id: String,
    pub claimed_at: KaiMoment,
}

impl ClaimPayload {
    /// Build the claim for `position` at `moment`. A lost position always
    /// pays out zero, whatever `payout` says.
    pub fn build(
        position: &Position,
        owner: &VaultOwner,
        moment: KaiMoment,
        payout: MicroAmount,
    ) -> Result<Self, CodecError> {
        let context = LineageContext {
            market_id: position.market_id.clone(),
            position_id: position.id.clone(),
            side: position.entry.side.as_str().to_string(),
        };
        let lineage_id = derive_lineage_id(&owner.identity_svg_hash, &context, &moment)?;
        let payout_phi_micro = if position.is_lost() {
            MicroAmount::ZERO
        } else {
            payout
        };
        Ok(Self {
            v: CLAIM_PAYLOAD_VERSION.to_string(),
            kind: "claim".to_string(),
            position_id: position.id.clone(),
            market_id: position.market_id.clone(),
            side: position.entry.side,
            outcome: position.resolution.as_ref().map(|r| r.outcome),
            status: position.status,
            stake_micro: position.entry.stake_micro,
            payout_phi_micro,
            user_phi_key: owner.user_phi_key.clone(),
            kai_signature: owner.kai_signature.clone(),
            lineage_root_svg_hash: owner.identity_svg_hash.clone(),
            lineage_id,
            claimed_at: moment,
        })
    }
}
