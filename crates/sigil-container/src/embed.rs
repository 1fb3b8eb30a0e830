//! Writing metadata blocks into SVG documents.
//!
//! A block is replaced in place when one with the same id exists, otherwise
//! inserted right before the last `</svg>`. No other byte of the document
//! changes, so embedding is idempotent and removal restores the original.

use crate::error::ContainerError;
use crate::extract::CONTAINER_BLOCK_ID;
use crate::metadata::EmbeddedMetadata;
use crate::scan::{self, Tag};

/// Embed the container object.
pub fn embed(document: &str, meta: &EmbeddedMetadata) -> Result<String, ContainerError> {
    let json = serde_json::to_string(meta)
        .map_err(|e| ContainerError::MetadataInvalidShape(e.to_string()))?;
    embed_block(document, CONTAINER_BLOCK_ID, &json)
}

/// Embed raw JSON text as a `<metadata id=...>` block.
pub fn embed_block(document: &str, id: &str, json: &str) -> Result<String, ContainerError> {
    let block = render_block(id, json);
    if let Some((start, end)) = scan::element_span(document, Tag::Metadata, id) {
        return Ok(format!("{}{block}{}", &document[..start], &document[end..]));
    }
    let close = document
        .rfind("</svg>")
        .ok_or_else(|| ContainerError::DocumentMalformed("no closing </svg> tag".to_string()))?;
    Ok(format!("{}{block}{}", &document[..close], &document[close..]))
}

/// Remove the `<metadata id=...>` block, if any.
pub fn remove_block(document: &str, id: &str) -> String {
    match scan::element_span(document, Tag::Metadata, id) {
        Some((start, end)) => format!("{}{}", &document[..start], &document[end..]),
        None => document.to_string(),
    }
}

fn render_block(id: &str, json: &str) -> String {
    format!(
        r#"<metadata id="{id}" type="application/json"><![CDATA[{}]]></metadata>"#,
        json.replace("]]>", "]]]]><![CDATA[>")
    )
}
