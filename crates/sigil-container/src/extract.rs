//! Reading JSON out of sigil documents.

use serde_json::Value;

use crate::error::ContainerError;
use crate::metadata::EmbeddedMetadata;
use crate::scan::{self, Tag};

/// `id` of the metadata block holding the container object.
pub const CONTAINER_BLOCK_ID: &str = "sigil-container";

/// Extract and validate the container object.
///
/// Blocks with `id="sigil-container"` are tried first, then any other
/// `<metadata>` block. The first outermost JSON object with the container
/// shape wins.
pub fn extract(document: &str) -> Result<EmbeddedMetadata, ContainerError> {
    let blocks = scan::candidates(document, Tag::Metadata, Some(CONTAINER_BLOCK_ID));
    if blocks.is_empty() {
        return Err(ContainerError::MetadataMissing);
    }

    let mut shape_error = None;
    let mut parse_error = None;
    for block in &blocks {
        for chunk in scan::outermost_json_objects(&block.text) {
            match serde_json::from_str::<Value>(chunk) {
                Ok(value) => match EmbeddedMetadata::from_value(value) {
                    Ok(meta) => return Ok(meta),
                    Err(e) => {
                        shape_error.get_or_insert(e);
                    }
                },
                Err(e) => {
                    parse_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
    }
    Err(shape_error.unwrap_or_else(|| {
        ContainerError::MetadataNotJson(
            parse_error.unwrap_or_else(|| "no JSON object in metadata".to_string()),
        )
    }))
}

/// Every JSON object embedded in the document, in lookup order:
/// `<metadata>` blocks, then `<desc>` blocks, then the whole text.
/// Pseudo-JSON that does not parse is skipped.
pub fn embedded_json_objects(document: &str) -> Vec<Value> {
    let mut texts: Vec<String> = scan::candidates(document, Tag::Metadata, None)
        .into_iter()
        .chain(scan::candidates(document, Tag::Desc, None))
        .map(|e| e.text)
        .collect();
    texts.push(document.to_string());

    let mut out = Vec::new();
    for text in &texts {
        for chunk in scan::outermost_json_objects(text) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(chunk) {
                if !out.contains(&value) {
                    out.push(value);
                }
            }
        }
    }
    out
}

/// The first JSON object embedded in the document.
pub fn extract_embedded_json(document: &str) -> Result<Value, ContainerError> {
    embedded_json_objects(document)
        .into_iter()
        .next()
        .ok_or(ContainerError::MetadataMissing)
}
