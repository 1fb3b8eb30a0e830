//! `gzip+base64` payload encoding.
//!
//! Compression uses a fixed gzip header (mtime 0, no file name) so the same
//! payload always encodes to the same string. Decoding accepts standard and
//! URL-safe base64, with or without padding.

use std::io::{Read, Write};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};

use crate::error::ContainerError;

/// The only encoding a container payload may declare.
pub const PAYLOAD_ENCODING: &str = "gzip+base64";

/// Upper bound on a decompressed payload.
pub const MAX_PAYLOAD_BYTES: u64 = 16 * 1024 * 1024;

pub fn gzip_base64(bytes: &[u8]) -> Result<String, ContainerError> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| ContainerError::PayloadDecode(format!("gzip failed: {e}")))?;
    let gz = encoder
        .finish()
        .map_err(|e| ContainerError::PayloadDecode(format!("gzip failed: {e}")))?;
    Ok(STANDARD.encode(gz))
}

pub fn gunzip_base64(encoded: &str) -> Result<Vec<u8>, ContainerError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let gz = STANDARD
        .decode(&compact)
        .or_else(|_| URL_SAFE_NO_PAD.decode(compact.trim_end_matches('=')))
        .map_err(|e| ContainerError::PayloadDecode(format!("invalid base64: {e}")))?;
    let mut out = Vec::new();
    GzDecoder::new(gz.as_slice())
        .take(MAX_PAYLOAD_BYTES + 1)
        .read_to_end(&mut out)
        .map_err(|e| ContainerError::PayloadDecode(format!("invalid gzip: {e}")))?;
    if out.len() as u64 > MAX_PAYLOAD_BYTES {
        return Err(ContainerError::PayloadDecode(format!(
            "payload exceeds {MAX_PAYLOAD_BYTES} bytes"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_deterministic() {
        let a = gzip_base64(br#"{"a":1}"#).unwrap();
        let b = gzip_base64(br#"{"a":1}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(gunzip_base64(&a).unwrap(), br#"{"a":1}"#);
    }

    #[test]
    fn header_has_zero_mtime() {
        let raw = STANDARD.decode(gzip_base64(b"x").unwrap()).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert_eq!(&raw[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn url_safe_and_wrapped_input_decodes() {
        let data = vec![0xfbu8; 300];
        let std_b64 = gzip_base64(&data).unwrap();
        let url = std_b64
            .replace('+', "-")
            .replace('/', "_")
            .trim_end_matches('=')
            .to_string();
        assert_eq!(gunzip_base64(&url).unwrap(), data);
        let wrapped: String = std_b64
            .as_bytes()
            .chunks(16)
            .map(|c| format!("{}\n", std::str::from_utf8(c).unwrap()))
            .collect();
        assert_eq!(gunzip_base64(&wrapped).unwrap(), data);
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(
            gunzip_base64("***"),
            Err(ContainerError::PayloadDecode(_))
        ));
        let not_gzip = STANDARD.encode(b"plain");
        assert!(matches!(
            gunzip_base64(&not_gzip),
            Err(ContainerError::PayloadDecode(_))
        ));
    }
}
