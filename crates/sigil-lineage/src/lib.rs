//! # sigil-lineage: Parent-to-Child Provenance
//!
//! A child sigil (a market position, a claim) declares the canonical hash
//! of its root sigil and a lineage id derived from that hash, its context
//! fields and its Kai moment. Verification recomputes the id from the
//! *actual* root document and re-derives any embedded identity key.

pub mod claim;
pub mod derive;
pub mod error;
pub mod payload;
pub mod verify;

pub use claim::{render_child_document, PositionClaim};
pub use derive::{canonical_svg_hash, derive_lineage_id, LineageContext, LINEAGE_DOMAIN};
pub use error::LineageError;
pub use payload::{ClaimPayload, MarketSide, MicroAmount, Position, PositionStatus, VaultOwner};
pub use verify::{verify_lineage, LineageReport};
