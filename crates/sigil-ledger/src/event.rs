//! Ledger events, their ids, and the merge order.
//!
//! An event id is a pure function of `(rootSigilId, kind, refId, pulse)`,
//! so two contexts recording the same movement derive the same id and
//! [`merge_events`] collapses them.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sigil_core::{domain_hash, KaiMoment};

use crate::error::LedgerError;

/// Domain tag for event ids.
pub const EVENT_ID_DOMAIN: &str = "SM-EVT-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventKind {
    Deposit,
    Withdraw,
    Lock,
    Unlock,
    Claim,
}

impl LedgerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
            Self::Claim => "CLAIM",
        }
    }
}

impl std::str::FromStr for LedgerEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAW" => Ok(Self::Withdraw),
            "LOCK" => Ok(Self::Lock),
            "UNLOCK" => Ok(Self::Unlock),
            "CLAIM" => Ok(Self::Claim),
            other => Err(format!("unknown ledger event kind {other:?}")),
        }
    }
}

/// Identifiers of the objects an event touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerHashes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_payload_hash: Option<String>,
}

/// A recorded value movement. Amounts are signed decimal micro-unit strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub event_id: String,
    pub kind: LedgerEventKind,
    pub root_sigil_id: String,
    pub root_svg_hash: String,
    pub kai_moment: KaiMoment,
    pub delta_phi_micro: String,
    pub resulting_balance_micro: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<LedgerRefs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<LedgerHashes>,
}

/// An event as submitted for recording, before its id is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLedgerEvent {
    pub kind: LedgerEventKind,
    pub root_sigil_id: String,
    pub root_svg_hash: String,
    pub kai_moment: KaiMoment,
    pub delta_phi_micro: String,
    pub resulting_balance_micro: String,
    /// Identifier of the vault, lock, or claim this movement belongs to.
    pub ref_id: String,
    #[serde(default)]
    pub refs: Option<LedgerRefs>,
    #[serde(default)]
    pub hashes: Option<LedgerHashes>,
}

fn is_decimal(s: &str, signed: bool) -> bool {
    let digits = match s.strip_prefix('-') {
        Some(rest) if signed => rest,
        _ => s,
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl NewLedgerEvent {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.root_sigil_id.trim().is_empty() {
            return Err(LedgerError::InvalidEvent("rootSigilId is empty".into()));
        }
        if self.root_svg_hash.trim().is_empty() {
            return Err(LedgerError::InvalidEvent("rootSvgHash is empty".into()));
        }
        self.kai_moment
            .validate()
            .map_err(|e| LedgerError::InvalidEvent(e.to_string()))?;
        if !is_decimal(&self.delta_phi_micro, true) {
            return Err(LedgerError::InvalidEvent(format!(
                "deltaPhiMicro {:?} is not a decimal integer",
                self.delta_phi_micro
            )));
        }
        if !is_decimal(&self.resulting_balance_micro, false) {
            return Err(LedgerError::InvalidEvent(format!(
                "resultingBalanceMicro {:?} is not a non-negative decimal integer",
                self.resulting_balance_micro
            )));
        }
        Ok(())
    }

    /// Validate, derive the id, and produce the stored event.
    pub fn into_event(self) -> Result<LedgerEvent, LedgerError> {
        self.validate()?;
        let event_id = derive_event_id(
            &self.root_sigil_id,
            self.kind,
            &self.ref_id,
            self.kai_moment.pulse,
        )?;
        Ok(LedgerEvent {
            event_id,
            kind: self.kind,
            root_sigil_id: self.root_sigil_id,
            root_svg_hash: self.root_svg_hash,
            kai_moment: self.kai_moment,
            delta_phi_micro: self.delta_phi_micro,
            resulting_balance_micro: self.resulting_balance_micro,
            refs: self.refs,
            hashes: self.hashes,
        })
    }
}

pub fn derive_event_id(
    root_sigil_id: &str,
    kind: LedgerEventKind,
    ref_id: &str,
    pulse: u64,
) -> Result<String, LedgerError> {
    Ok(domain_hash(
        &json!([root_sigil_id, kind.as_str(), ref_id, pulse]),
        EVENT_ID_DOMAIN,
    )?)
}

/// Map key used for ids and root ids: trimmed and lowercased.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Union of two event lists keyed by normalized id.
///
/// The first occurrence of an id wins, so `existing` entries are never
/// replaced. The result is stably sorted ascending by Kai moment.
pub fn merge_events(existing: &[LedgerEvent], incoming: &[LedgerEvent]) -> Vec<LedgerEvent> {
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<LedgerEvent> = existing
        .iter()
        .chain(incoming)
        .filter(|e| seen.insert(normalize_key(&e.event_id)))
        .cloned()
        .collect();
    merged.sort_by_key(|e| e.kai_moment);
    merged
}

/// The latest event for `root_sigil_id` by Kai moment. Ties keep the
/// earliest-seen event.
pub fn latest_event_for_root<'a>(
    root_sigil_id: &str,
    events: impl IntoIterator<Item = &'a LedgerEvent>,
) -> Option<&'a LedgerEvent> {
    let key = normalize_key(root_sigil_id);
    if key.is_empty() {
        return None;
    }
    events
        .into_iter()
        .filter(|e| normalize_key(&e.root_sigil_id) == key)
        .fold(None, |latest: Option<&LedgerEvent>, e| match latest {
            Some(l) if e.kai_moment <= l.kai_moment => Some(l),
            _ => Some(e),
        })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn new_event(root: &str, ref_id: &str, pulse: u64) -> NewLedgerEvent {
        NewLedgerEvent {
            kind: LedgerEventKind::Deposit,
            root_sigil_id: root.into(),
            root_svg_hash: "svg-hash".into(),
            kai_moment: KaiMoment::from_pulse(pulse),
            delta_phi_micro: "1000000".into(),
            resulting_balance_micro: "1000000".into(),
            ref_id: ref_id.into(),
            refs: None,
            hashes: None,
        }
    }

    pub fn event(root: &str, ref_id: &str, pulse: u64) -> LedgerEvent {
        new_event(root, ref_id, pulse).into_event().unwrap()
    }
}


#[cfg(test)]
mod proptests {
    use super::fixtures::event;
    use super::*;
    use proptest::prelude::*;

    fn events() -> impl Strategy<Value = Vec<LedgerEvent>> {
        prop::collection::vec(("[a-c]", "[0-9]{1,2}", 0u64..50), 0..12).prop_map(|specs| {
            specs
                .into_iter()
                .map(|(root, r, pulse)| event(&root, &r, pulse))
                .collect()
        })
    }

    fn ids(events: &[LedgerEvent]) -> std::collections::BTreeSet<String> {
        events.iter().map(|e| normalize_key(&e.event_id)).collect()
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(a in events(), b in events()) {
            let once = merge_events(&a, &b);
            prop_assert_eq!(merge_events(&once, &b), once.clone());
            prop_assert_eq!(merge_events(&once, &once), once);
        }

        #[test]
        fn merge_content_is_commutative(a in events(), b in events()) {
            prop_assert_eq!(ids(&merge_events(&a, &b)), ids(&merge_events(&b, &a)));
        }

        #[test]
        fn merge_output_is_sorted(a in events(), b in events()) {
            let merged = merge_events(&a, &b);
            prop_assert!(merged.windows(2).all(|w| w[0].kai_moment <= w[1].kai_moment));
        }
    }
}
