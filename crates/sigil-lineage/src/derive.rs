//! Lineage id derivation.
//!
//! `lineageId = hash([rootHash, marketId, positionId, side, pulse, beat,
//! stepIndex], "SM:LINEAGE:1")`. The array form is fixed-order, so no two
//! distinct inputs share a preimage and changing any field changes the id.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sigil_core::{domain_hash, CodecError, KaiMoment};

pub use sigil_container::canonical_svg_hash;

/// Domain tag for lineage ids.
pub const LINEAGE_DOMAIN: &str = "SM:LINEAGE:1";

/// Context fields a child sigil is derived under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageContext {
    pub market_id: String,
    pub position_id: String,
    pub side: String,
}

pub fn derive_lineage_id(
    root_hash: &str,
    context: &LineageContext,
    moment: &KaiMoment,
) -> Result<String, CodecError> {
    domain_hash(
        &json!([
            root_hash,
            context.market_id,
            context.position_id,
            context.side,
            moment.pulse,
            moment.beat,
            moment.step_index,
        ]),
        LINEAGE_DOMAIN,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LineageContext {
        LineageContext {
            market_id: "m1".into(),
            position_id: "p1".into(),
            side: "YES".into(),
        }
    }

    fn moment() -> KaiMoment {
        KaiMoment::from_pulse(123)
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            derive_lineage_id("root", &ctx(), &moment()).unwrap(),
            "de246b58aec673d35717264bf648d27174c45e5d8597b5006349f8499ddd8567"
        );
    }

    #[test]
    fn every_field_matters() {
        let base = derive_lineage_id("root", &ctx(), &moment()).unwrap();
        let variants = [
            derive_lineage_id("root2", &ctx(), &moment()),
            derive_lineage_id(
                "root",
                &LineageContext {
                    market_id: "m2".into(),
                    ..ctx()
                },
                &moment(),
            ),
            derive_lineage_id(
                "root",
                &LineageContext {
                    position_id: "p2".into(),
                    ..ctx()
                },
                &moment(),
            ),
            derive_lineage_id(
                "root",
                &LineageContext {
                    side: "NO".into(),
                    ..ctx()
                },
                &moment(),
            ),
            derive_lineage_id("root", &ctx(), &KaiMoment { pulse: 124, ..moment() }),
            derive_lineage_id("root", &ctx(), &KaiMoment { beat: 5, ..moment() }),
            derive_lineage_id("root", &ctx(), &KaiMoment { step_index: 10, ..moment() }),
        ];
        for v in variants {
            assert_ne!(v.unwrap(), base);
        }
    }

    #[test]
    fn concatenation_is_unambiguous() {
        let a = LineageContext {
            market_id: "ab".into(),
            position_id: "c".into(),
            side: "YES".into(),
        };
        let b = LineageContext {
            market_id: "a".into(),
            position_id: "bc".into(),
            side: "YES".into(),
        };
        assert_ne!(
            derive_lineage_id("r", &a, &moment()).unwrap(),
            derive_lineage_id("r", &b, &moment()).unwrap()
        );
    }
}
