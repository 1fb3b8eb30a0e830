//! # Container Subcommand
//!
//! Seal a JSON payload into an SVG document, open a sealed document and
//! check its integrity, and stamp or verify the proof bundle block.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};

use sigil_container::{
    embed, extract_and_open, seal, stamp_proof_bundle, verify_proof_bundle, PayloadSigner,
    SignatureStatus,
};
use sigil_core::DigestAlgorithm;
use sigil_crypto::Ed25519KeyPair;

#[derive(Args, Debug)]
pub struct ContainerArgs {
    #[command(subcommand)]
    pub command: ContainerCommand,
}

#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// Embed a sealed payload into an SVG document.
    Seal {
        /// JSON payload to seal.
        #[arg(value_name = "PAYLOAD_JSON")]
        payload: PathBuf,
        /// SVG document to embed into.
        #[arg(long)]
        svg: PathBuf,
        /// Ed25519 seed as 64 hex characters, or a file containing it.
        #[arg(long)]
        key: Option<String>,
        /// Payload hash algorithm: sha256 or blake3.
        #[arg(long, default_value = "sha256")]
        alg: String,
        /// Optional JSON object placed in the header.
        #[arg(long)]
        header: Option<PathBuf>,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Extract, decode and verify a sealed document.
    Open {
        #[arg(value_name = "SVG")]
        svg: PathBuf,
    },
    /// Embed a proof bundle with fresh svgHash and bundleHash.
    StampBundle {
        #[arg(value_name = "SVG")]
        svg: PathBuf,
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Recompute the hashes of an embedded proof bundle.
    VerifyBundle {
        #[arg(value_name = "SVG")]
        svg: PathBuf,
    },
}

pub fn run_container(args: &ContainerArgs) -> Result<u8> {
    match &args.command {
        ContainerCommand::Seal {
            payload,
            svg,
            key,
            alg,
            header,
            out,
        } => cmd_seal(payload, svg, key.as_deref(), alg, header.as_deref(), out.as_deref()),
        ContainerCommand::Open { svg } => cmd_open(svg),
        ContainerCommand::StampBundle { svg, bundle, out } => {
            let document = crate::read_text(svg)?;
            let bundle = crate::read_json(bundle)?;
            let (stamped, hashes) = stamp_proof_bundle(&document, &bundle)?;
            tracing::info!(?hashes, "stamped proof bundle");
            crate::write_or_print(&stamped, out.as_deref())?;
            Ok(0)
        }
        ContainerCommand::VerifyBundle { svg } => {
            let check = verify_proof_bundle(&crate::read_text(svg)?)?;
            if check.ok() {
                println!("OK: proof bundle hashes match");
                Ok(0)
            } else {
                println!(
                    "FAIL: svgHash {}, bundleHash {}",
                    if check.svg_hash_ok { "ok" } else { "mismatch" },
                    if check.bundle_hash_ok { "ok" } else { "mismatch" },
                );
                Ok(1)
            }
        }
    }
}

/// Parse a signing key given inline or as a file path.
pub fn load_key(key: &str) -> Result<Ed25519KeyPair> {
    let path = Path::new(key);
    let hex = if path.is_file() {
        crate::read_text(path)?
    } else {
        key.to_string()
    };
    Ed25519KeyPair::from_seed_hex(hex.trim()).context("invalid Ed25519 seed")
}

fn cmd_seal(
    payload: &Path,
    svg: &Path,
    key: Option<&str>,
    alg: &str,
    header: Option<&Path>,
    out: Option<&Path>,
) -> Result<u8> {
    let payload = crate::read_json(payload)?;
    let document = crate::read_text(svg)?;
    let alg: DigestAlgorithm = alg.parse().map_err(|e: String| anyhow!(e))?;
    let header: Map<String, Value> = match header {
        Some(path) => match crate::read_json(path)? {
            Value::Object(map) => map,
            _ => return Err(anyhow!("header {} must be a JSON object", path.display())),
        },
        None => Map::new(),
    };
    let keypair = key.map(load_key).transpose()?;
    let signer = keypair.as_ref().map(|k| k as &dyn PayloadSigner);

    let meta = seal(&payload, header, alg, signer)?;
    let sealed = embed(&document, &meta)?;
    tracing::info!(
        hash = %meta.integrity.payload_hash.value,
        signed = signer.is_some(),
        "sealed payload"
    );
    crate::write_or_print(&sealed, out)?;
    Ok(0)
}

fn cmd_open(svg: &Path) -> Result<u8> {
    let opened = extract_and_open(&crate::read_text(svg)?)?;
    let signature = match &opened.signature {
        SignatureStatus::Verified { public } => json!({"status": "verified", "public": public}),
        SignatureStatus::Unverifiable { algorithm } => {
            json!({"status": "unverifiable", "algorithm": algorithm.as_str()})
        }
        SignatureStatus::Unsigned => json!({"status": "unsigned"}),
    };
    crate::print_json(&json!({
        "header": opened.header,
        "payload": opened.payload,
        "payloadHash": {
            "alg": opened.digest.algorithm.as_str(),
            "value": opened.digest.to_hex(),
        },
        "signature": signature,
    }))?;
    Ok(0)
}
