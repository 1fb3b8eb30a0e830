//! # API Route Modules
//!
//! - `proof`: membership proof generation and verification.
//! - `seal`: prophecy sealing into SVG sigils.
//! - `sigils`: retrieval of sealed sigils.

pub mod proof;
pub mod seal;
pub mod sigils;
