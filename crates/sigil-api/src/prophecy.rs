//! # Prophecy Sealing
//!
//! A prophecy submission carries its own canonical hash, computed by the
//! client over a fixed subset of payload fields. Sealing recomputes that
//! hash with the shared codec, rejects any mismatch, and renders the
//! artifact with the payload and its proof bundle in metadata blocks.
//!
//! Browser clients build the subset from possibly-undefined fields, and an
//! undefined field serializes as the string `"undefined"`. The hash here
//! reproduces that: an absent field hashes as `"undefined"`, except the four
//! optional fields clients default to `null`.

use serde_json::{json, Map, Value};
use sigil_container::embed::embed_block;
use sigil_container::ContainerError;
use sigil_core::{sha256_hex, stable_stringify, CodecError};
use thiserror::Error;

pub const PROPHECY_VERSION: &str = "SM-PROPHECY-1";
pub const PROPHECY_CANON_PREFIX: &str = "SM:PROPHECY:CANON:";
pub const PROPHECY_BLOCK_ID: &str = "sm-prophecy";
pub const ZK_BLOCK_ID: &str = "sm-zk";
const DEFAULT_ZK_SCHEME: &str = "groth16-poseidon";

/// Fields covered by the canonical hash.
const CANON_FIELDS: [&str; 17] = [
    "v",
    "kind",
    "prophecyId",
    "text",
    "textEnc",
    "category",
    "expirationPulse",
    "escrowPhiMicro",
    "evidence",
    "userPhiKey",
    "kaiSignature",
    "pulse",
    "beat",
    "stepIndex",
    "stepPct",
    "chakraDay",
    "createdAtPulse",
];

/// Subset fields that hash as `null` when absent.
const NULLABLE_FIELDS: [&str; 4] = ["category", "expirationPulse", "escrowPhiMicro", "evidence"];

/// Stand-in for an absent non-nullable subset field.
const UNDEFINED: &str = "undefined";

const REQUIRED_FIELDS: [&str; 4] = ["text", "userPhiKey", "kaiSignature", "canonicalHash"];

#[derive(Error, Debug)]
pub enum ProphecyError {
    #[error("invalid payload: expected {{kind: \"prophecy\", payload: {{...}}}}")]
    InvalidPayload,

    #[error("invalid payload kind: expected kind \"prophecy\" and v \"SM-PROPHECY-1\"")]
    InvalidKind,

    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("missing zk bundle: zk.proof and zk.publicInputs are required")]
    MissingZkBundle,

    #[error("zk poseidonHash {declared} does not match public input {public_input}")]
    ZkPublicInputMismatch {
        declared: String,
        public_input: String,
    },

    #[error("canonical hash mismatch: declared {declared}, computed {computed}")]
    CanonicalHashMismatch { declared: String, computed: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Render(#[from] ContainerError),
}

impl ProphecyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::InvalidKind => "INVALID_PAYLOAD_KIND",
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::MissingZkBundle => "MISSING_ZK_BUNDLE",
            Self::ZkPublicInputMismatch { .. } => "ZK_PUBLIC_INPUT_MISMATCH",
            Self::CanonicalHashMismatch { .. } => "CANONICAL_HASH_MISMATCH",
            Self::Codec(_) | Self::Render(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Codec(_) | Self::Render(_))
    }
}

/// The artifact produced by [`seal_prophecy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedProphecy {
    pub sigil_id: String,
    pub svg: String,
    /// SHA-256 of the rendered document.
    pub svg_hash: String,
    pub canonical_hash: String,
}

/// `SHA-256("SM:PROPHECY:CANON:" + stable_stringify(subset))`, lowercase hex.
pub fn canonical_hash(payload: &Map<String, Value>) -> Result<String, CodecError> {
    let subset: Map<String, Value> = CANON_FIELDS
        .iter()
        .map(|k| {
            let value = match payload.get(*k) {
                Some(v) => v.clone(),
                None if NULLABLE_FIELDS.contains(k) => Value::Null,
                None => Value::String(UNDEFINED.to_string()),
            };
            (k.to_string(), value)
        })
        .collect();
    let canon = stable_stringify(&Value::Object(subset))?;
    Ok(sha256_hex(format!("{PROPHECY_CANON_PREFIX}{canon}").as_bytes()))
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
        Some(_) => true,
    }
}

fn text_of(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Validate a `{kind, payload, textEncoded?}` submission and render it.
pub fn seal_prophecy(body: &Value) -> Result<SealedProphecy, ProphecyError> {
    let mut payload = match (body.get("kind"), body.get("payload")) {
        (Some(Value::String(kind)), Some(Value::Object(p))) if kind == "prophecy" => p.clone(),
        _ => return Err(ProphecyError::InvalidPayload),
    };
    if payload.get("kind").and_then(Value::as_str) != Some("prophecy")
        || payload.get("v").and_then(Value::as_str) != Some(PROPHECY_VERSION)
    {
        return Err(ProphecyError::InvalidKind);
    }
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|f| !truthy(payload.get(*f)))
        .collect();
    if !missing.is_empty() {
        return Err(ProphecyError::MissingFields(missing));
    }

    let zk = payload.get("zk").cloned().unwrap_or(Value::Null);
    if !truthy(zk.get("proof")) || !truthy(zk.get("publicInputs")) {
        return Err(ProphecyError::MissingZkBundle);
    }
    let first_input = zk
        .get("publicInputs")
        .and_then(Value::as_array)
        .and_then(|inputs| inputs.first())
        .map(|v| text_of(Some(v)));
    if let (Some(declared), Some(public_input)) = (zk.get("poseidonHash"), first_input) {
        let declared = text_of(Some(declared));
        if !declared.is_empty() && declared.trim() != public_input.trim() {
            return Err(ProphecyError::ZkPublicInputMismatch {
                declared,
                public_input,
            });
        }
    }

    let computed = canonical_hash(&payload)?;
    let declared = text_of(payload.get("canonicalHash"));
    if computed != declared.to_lowercase() {
        return Err(ProphecyError::CanonicalHashMismatch { declared, computed });
    }

    let sigil_id = match payload.get("prophecyId") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        _ => format!("prophecy_{}", &computed[..40]),
    };
    payload.insert("prophecyId".into(), Value::String(sigil_id.clone()));

    let text_encoded = body
        .get("textEncoded")
        .and_then(Value::as_str)
        .map(str::to_string);
    let svg = render_prophecy_svg(&payload, &zk, text_encoded)?;
    let svg_hash = sha256_hex(svg.as_bytes());
    tracing::info!(%sigil_id, %svg_hash, "sealed prophecy sigil");

    Ok(SealedProphecy {
        sigil_id,
        svg,
        svg_hash,
        canonical_hash: declared,
    })
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode everything except the URI component unreserved set.
fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn render_prophecy_svg(
    payload: &Map<String, Value>,
    zk: &Value,
    text_encoded: Option<String>,
) -> Result<String, ProphecyError> {
    let field = |k: &str| text_of(payload.get(k));
    let text = field("text");
    let text_enc = payload
        .get("textEnc")
        .and_then(Value::as_str)
        .unwrap_or("uri")
        .to_string();
    let encoded_text = text_encoded.unwrap_or_else(|| encode_uri_component(&text));
    let scheme = zk
        .get("scheme")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ZK_SCHEME)
        .to_string();
    let poseidon_hash = text_of(zk.get("poseidonHash"));

    let mut embedded = payload.clone();
    embedded.insert("textEncoded".into(), Value::String(encoded_text.clone()));
    embedded.insert("textEnc".into(), Value::String(text_enc.clone()));
    let payload_json = Value::Object(embedded).to_string();

    let mut zk_block = json!({
        "scheme": scheme,
        "proof": zk.get("proof").cloned().unwrap_or(Value::Null),
        "publicInputs": zk.get("publicInputs").cloned().unwrap_or(Value::Null),
        "poseidonHash": poseidon_hash,
    });
    if let Some(hint) = zk.get("verifiedHint").filter(|h| !h.is_null()) {
        zk_block["verifiedHint"] = hint.clone();
    }

    let desc_text: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let desc_text: String = desc_text.chars().take(140).collect();
    let expiration = field("expirationPulse");
    let desc = if expiration.is_empty() || expiration == "0" {
        format!("Prophecy • {desc_text}")
    } else {
        format!("Prophecy • {desc_text} • exp p{expiration}")
    };
    let pulse = field("pulse");
    let category = field("category");

    let shell = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1000 1000" width="1000" height="1000" role="img" aria-label="{label}" data-kind="prophecy" data-v="{version}" data-prophecy-id="{id}" data-text="{data_text}" data-text-enc="{text_enc}" data-category="{category}" data-expiration="{expiration}" data-phikey="{phikey}" data-kai-signature="{kai_sig}" data-pulse="{pulse}" data-beat="{beat}" data-step-index="{step}" data-payload-hash="{hash}" data-zk-scheme="{scheme}" data-zk-poseidon-hash="{poseidon}">
  <title>{title}</title>
  <desc>{desc}</desc>
  <rect x="0" y="0" width="1000" height="1000" fill="rgba(8,10,18,1)"/>
  <circle cx="500" cy="500" r="360" fill="none" stroke="rgba(255,255,255,0.10)" stroke-width="10"/>
  <circle cx="500" cy="500" r="98" fill="none" stroke="rgba(120,255,240,0.85)" stroke-width="6"/>
  <g font-family="ui-monospace, monospace" fill="rgba(255,255,255,0.78)">
    <text x="70" y="88" font-size="22">{version}</text>
    <text x="70" y="120" font-size="16">p{pulse} • beat {beat} • step {step}</text>
    <text x="70" y="910" font-size="16">{category_label}</text>
    <text x="70" y="940" font-size="14">{desc_short}</text>
  </g>
</svg>"#,
        label = escape_xml(&format!("Prophecy Sigil {}", field("prophecyId"))),
        version = PROPHECY_VERSION,
        id = escape_xml(&field("prophecyId")),
        data_text = escape_xml(&encoded_text),
        text_enc = escape_xml(&text_enc),
        category = escape_xml(&category),
        expiration = escape_xml(&expiration),
        phikey = escape_xml(&field("userPhiKey")),
        kai_sig = escape_xml(&field("kaiSignature")),
        pulse = escape_xml(&pulse),
        beat = escape_xml(&field("beat")),
        step = escape_xml(&field("stepIndex")),
        hash = escape_xml(&field("canonicalHash")),
        scheme = escape_xml(&scheme),
        poseidon = escape_xml(&poseidon_hash),
        title = escape_xml(&format!("Prophecy Sigil • p{pulse}")),
        desc = escape_xml(&desc),
        category_label = escape_xml(if category.is_empty() { "Prophecy" } else { &category }),
        desc_short = escape_xml(&desc_text),
    );

    let svg = embed_block(&shell, PROPHECY_BLOCK_ID, &payload_json)?;
    Ok(embed_block(&svg, ZK_BLOCK_ID, &zk_block.to_string())?)
}


#[cfg(test)]
mod tests {
    use super::fixtures::submission;
    use super::*;

    #[test]
    fn canonical_hash_ignores_key_order_and_extra_fields() {
        let a = json!({"v": PROPHECY_VERSION, "kind": "prophecy", "text": "x"});
        let b = json!({"text": "x", "kind": "prophecy", "v": PROPHECY_VERSION, "zk": {"a": 1}});
        assert_eq!(
            canonical_hash(a.as_object().unwrap()).unwrap(),
            canonical_hash(b.as_object().unwrap()).unwrap()
        );
    }

    #[test]
    fn canonical_hash_covers_subset_fields() {
        let a = json!({"text": "x", "pulse": 1});
        let b = json!({"text": "x", "pulse": 2});
        assert_ne!(
            canonical_hash(a.as_object().unwrap()).unwrap(),
            canonical_hash(b.as_object().unwrap()).unwrap()
        );
    }

    #[test]
    fn absent_fields_hash_like_browser_clients() {
        let minimal = json!({"v": PROPHECY_VERSION, "kind": "prophecy", "text": "x"});
        assert_eq!(
            canonical_hash(minimal.as_object().unwrap()).unwrap(),
            "bf3264f2f17dc51c710a1ed33fb408f56317c3cfa1c397645fc6cb58648551b5"
        );

        let hash = |v: Value| canonical_hash(v.as_object().unwrap()).unwrap();
        assert_eq!(
            hash(json!({"text": "x"})),
            hash(json!({"text": "x", "prophecyId": "undefined"}))
        );
        assert_ne!(
            hash(json!({"text": "x"})),
            hash(json!({"text": "x", "prophecyId": null}))
        );
        assert_eq!(
            hash(json!({"text": "x"})),
            hash(json!({"text": "x", "category": null}))
        );
    }

    #[test]
    fn seals_valid_submission() {
        let body = submission(None);
        let declared = body["payload"]["canonicalHash"].as_str().unwrap().to_string();
        let sealed = seal_prophecy(&body).unwrap();
        assert_eq!(sealed.canonical_hash, declared);
        assert_eq!(sealed.sigil_id, format!("prophecy_{}", &declared[..40]));
        assert_eq!(sealed.svg_hash, sha256_hex(sealed.svg.as_bytes()));
        assert!(sealed.svg.contains(r#"<metadata id="sm-prophecy""#));
        assert!(sealed.svg.contains(r#"<metadata id="sm-zk""#));
        assert!(sealed.svg.contains("&lt;rises&gt;"));
        assert!(sealed.svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn embedded_payload_is_recoverable() {
        let sealed = seal_prophecy(&submission(Some("prophecy-7"))).unwrap();
        assert_eq!(sealed.sigil_id, "prophecy-7");
        let objects = sigil_container::embedded_json_objects(&sealed.svg);
        let payload = objects
            .iter()
            .find(|o| o.get("kind") == Some(&json!("prophecy")))
            .unwrap();
        assert_eq!(payload["prophecyId"], "prophecy-7");
        assert_eq!(payload["textEnc"], "uri");
        assert_eq!(
            payload["textEncoded"],
            "The%20river%20%3Crises%3E%20at%20beat%2012%20%26%20falls%20by%20step%2030"
        );
        let zk = objects.iter().find(|o| o.get("scheme").is_some()).unwrap();
        assert_eq!(zk["poseidonHash"], "123");
    }

    #[test]
    fn rejects_wrong_envelope_and_kind() {
        assert!(matches!(
            seal_prophecy(&json!({"kind": "position", "payload": {}})),
            Err(ProphecyError::InvalidPayload)
        ));
        let mut body = submission(None);
        body["payload"]["v"] = json!("SM-PROPHECY-0");
        assert!(matches!(
            seal_prophecy(&body),
            Err(ProphecyError::InvalidKind)
        ));
    }

    #[test]
    fn reports_every_missing_field() {
        let mut body = submission(None);
        let payload = body["payload"].as_object_mut().unwrap();
        payload.remove("text");
        payload.insert("kaiSignature".into(), json!(""));
        match seal_prophecy(&body) {
            Err(ProphecyError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["text", "kaiSignature"])
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_zk_bundle() {
        let mut body = submission(None);
        body["payload"]["zk"]["proof"] = Value::Null;
        assert!(matches!(
            seal_prophecy(&body),
            Err(ProphecyError::MissingZkBundle)
        ));
    }

    #[test]
    fn rejects_poseidon_hash_disagreeing_with_public_input() {
        let mut body = submission(None);
        body["payload"]["zk"]["poseidonHash"] = json!("456");
        assert!(matches!(
            seal_prophecy(&body),
            Err(ProphecyError::ZkPublicInputMismatch { .. })
        ));
    }

    #[test]
    fn rejects_tampered_text() {
        let mut body = submission(None);
        body["payload"]["text"] = json!("The river falls");
        let err = seal_prophecy(&body).unwrap_err();
        assert_eq!(err.code(), "CANONICAL_HASH_MISMATCH");
    }

    #[test]
    fn declared_hash_is_case_insensitive() {
        let mut body = submission(None);
        let upper = body["payload"]["canonicalHash"]
            .as_str()
            .unwrap()
            .to_uppercase();
        body["payload"]["canonicalHash"] = json!(upper);
        assert!(seal_prophecy(&body).is_ok());
    }

    #[test]
    fn uri_component_encoding() {
        assert_eq!(encode_uri_component("a b/ü"), "a%20b%2F%C3%BC");
        assert_eq!(encode_uri_component("(ok)!~*'"), "(ok)!~*'");
    }
}
