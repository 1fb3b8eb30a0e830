//! Position claims: the JSON a child sigil embeds to declare its lineage.

use serde::{Deserialize, Serialize};
use sigil_container::embed::embed_block;
use sigil_container::ContainerError;
use sigil_core::KaiMoment;
use sigil_crypto::derive_phi_key;

use crate::derive::{derive_lineage_id, LineageContext};
use crate::error::LineageError;

pub const POSITION_CLAIM_VERSION: &str = "SM-POS-1";

/// `id` of the metadata block a rendered child document uses.
pub const POSITION_BLOCK_ID: &str = "sm-position";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionClaim {
    pub v: String,
    pub kind: String,
    #[serde(flatten)]
    pub context: LineageContext,
    pub lineage_root_svg_hash: String,
    pub lineage_id: String,
    pub kai_moment: KaiMoment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phi_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kai_signature: Option<String>,
}

impl PositionClaim {
    /// Build a claim under `root_hash`. The phi key is derived from the
    /// signature when one is given. A moment whose step index disagrees
    /// with its pulse is rejected.
    pub fn build(
        root_hash: &str,
        context: LineageContext,
        moment: KaiMoment,
        kai_signature: Option<String>,
    ) -> Result<Self, LineageError> {
        moment.validate()?;
        let lineage_id = derive_lineage_id(root_hash, &context, &moment)?;
        let user_phi_key = kai_signature
            .as_deref()
            .map(|sig| derive_phi_key(sig).to_string());
        Ok(Self {
            v: POSITION_CLAIM_VERSION.to_string(),
            kind: "position".to_string(),
            context,
            lineage_root_svg_hash: root_hash.to_string(),
            lineage_id,
            kai_moment: moment,
            user_phi_key,
            kai_signature,
        })
    }
}

/// A minimal SVG carrying `claim` in a CDATA metadata block.
pub fn render_child_document(claim: &PositionClaim) -> Result<String, ContainerError> {
    let json = serde_json::to_string(claim)
        .map_err(|e| ContainerError::MetadataInvalidShape(e.to_string()))?;
    let shell = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100" data-lineage-id="{}"><rect width="100" height="100" fill="none"/></svg>"#,
        claim.lineage_id
    );
    embed_block(&shell, POSITION_BLOCK_ID, &json)
}
