//! Deterministic Kai signature for a pulse.
//!
//! `kai_signature = BLAKE3(BLAKE3(be32(pulse) || pad32(utf8(intention))))`,
//! rendered as lowercase hex. Both fields are left-padded with zeros to 32
//! bytes; an intention longer than 32 bytes is used as-is.

/// Intention folded into every signature unless overridden.
pub const SYSTEM_INTENTION: &str = "Enter my portal";

const FIELD_LEN: usize = 32;

/// Compute the Kai signature for a pulse and intention.
pub fn kai_signature(pulse: u64, intention: &str) -> String {
    let mut input = Vec::with_capacity(FIELD_LEN * 2);
    input.extend_from_slice(&[0u8; FIELD_LEN - 8]);
    input.extend_from_slice(&pulse.to_be_bytes());

    let intent = intention.as_bytes();
    if intent.len() < FIELD_LEN {
        input.extend(std::iter::repeat(0u8).take(FIELD_LEN - intent.len()));
    }
    input.extend_from_slice(intent);

    let inner = blake3::hash(&input);
    blake3::hash(inner.as_bytes()).to_hex().to_string()
}
