//! Lineage verification.
//!
//! The child's self-declared root hash is never trusted on its own: the
//! expected lineage id is recomputed from the root document's actual hash,
//! so a forged child cannot claim arbitrary ancestry. The stored moment's
//! step index is likewise re-derived from its pulse.

use serde::Serialize;
use sigil_container::{canonical_svg_hash, embedded_json_objects};
use sigil_crypto::derive_phi_key;

use crate::claim::PositionClaim;
use crate::derive::derive_lineage_id;
use crate::error::LineageError;

/// Result of [`verify_lineage`]. `ok` is true only when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageReport {
    pub ok: bool,
    pub errors: Vec<LineageError>,
}

impl LineageReport {
    fn from_errors(errors: Vec<LineageError>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }
}

fn find_claim(child_document: &str) -> Result<PositionClaim, LineageError> {
    let objects = embedded_json_objects(child_document);
    if objects.is_empty() {
        return Err(LineageError::ClaimMissing);
    }
    let mut first_error = None;
    for value in objects {
        let looks_like_claim = value.get("lineageId").is_some();
        match serde_json::from_value::<PositionClaim>(value) {
            Ok(claim) => return Ok(claim),
            Err(e) if looks_like_claim => {
                first_error.get_or_insert_with(|| e.to_string());
            }
            Err(_) => {}
        }
    }
    Err(match first_error {
        Some(reason) => LineageError::ClaimInvalid { reason },
        None => LineageError::ClaimMissing,
    })
}

/// Check `child_document`'s embedded claim against `root_document`.
pub fn verify_lineage(child_document: &str, root_document: &str) -> LineageReport {
    let claim = match find_claim(child_document) {
        Ok(claim) => claim,
        Err(e) => return LineageReport::from_errors(vec![e]),
    };
    let mut errors = Vec::new();

    if let Err(e) = claim.kai_moment.validate() {
        errors.push(e.into());
    }

    let root_hash = canonical_svg_hash(root_document);
    if !claim.lineage_root_svg_hash.eq_ignore_ascii_case(&root_hash) {
        errors.push(LineageError::RootHashMismatch {
            declared: claim.lineage_root_svg_hash.clone(),
            recomputed: root_hash.clone(),
        });
    }

    match derive_lineage_id(&root_hash, &claim.context, &claim.kai_moment) {
        Ok(expected) if expected != claim.lineage_id.to_ascii_lowercase() => {
            errors.push(LineageError::LineageIdMismatch {
                declared: claim.lineage_id.clone(),
                expected,
            });
        }
        Ok(_) => {}
        Err(e) => errors.push(e.into()),
    }

    match (&claim.user_phi_key, &claim.kai_signature) {
        (Some(declared), Some(sig)) => {
            let derived = derive_phi_key(sig);
            if declared.trim() != derived.as_str() {
                errors.push(LineageError::PhiKeyMismatch {
                    declared: declared.clone(),
                    derived: derived.to_string(),
                });
            }
        }
        (Some(_), None) => errors.push(LineageError::MissingSignature),
        (None, _) => {}
    }

    if !errors.is_empty() {
        tracing::debug!(
            lineage_id = %claim.lineage_id,
            failures = errors.len(),
            "lineage verification failed"
        );
    }
    LineageReport::from_errors(errors)
}
