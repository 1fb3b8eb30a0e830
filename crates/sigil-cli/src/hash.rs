//! # Hash Subcommand
//!
//! Canonical hash of a JSON document. With `--tag` the digest is the
//! domain-separated `SHA-256(tag ":" canonical)`; without it, the plain
//! digest of the canonical bytes under `--alg`.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;

use sigil_core::{compute_digest, domain_hash, stable_stringify, DigestAlgorithm};

#[derive(Args, Debug)]
pub struct HashArgs {
    /// JSON file to hash.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Domain tag, e.g. `SM-EVT-1`.
    #[arg(long)]
    pub tag: Option<String>,
    /// Digest algorithm when no tag is given.
    #[arg(long, default_value = "sha256")]
    pub alg: String,
    /// Print the canonical form as well.
    #[arg(long)]
    pub show_canonical: bool,
}

pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let value = crate::read_json(&args.file)?;
    let canonical = stable_stringify(&value)?;
    let digest = match &args.tag {
        Some(tag) => domain_hash(&value, tag)?,
        None => {
            let alg: DigestAlgorithm = args.alg.parse().map_err(|e: String| anyhow!(e))?;
            compute_digest(alg, canonical.as_bytes()).to_hex()
        }
    };
    if args.show_canonical {
        println!("{canonical}");
    }
    println!("{digest}");
    Ok(0)
}
