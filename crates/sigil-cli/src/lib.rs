//! # sigil-cli: Command-Line Interface for the Sigil Engine
//!
//! ## Subcommands
//!
//! - `sigil kai`: Kai moments and calendar placement.
//! - `sigil hash`: domain-separated codec hash of a JSON document.
//! - `sigil zk`: Poseidon hashing, membership proofs and key setup.
//! - `sigil container`: seal a payload into an SVG, open a sealed SVG.
//! - `sigil lineage`: derive and verify child sigils.
//! - `sigil ledger`: inspect and mutate the file-backed ledger.
//!
//! Every handler returns `anyhow::Result<u8>`; the exit code is the `u8`.
//! Results go to stdout as JSON, diagnostics to stderr via `tracing`.

pub mod config;
pub mod container;
pub mod hash;
pub mod kai;
pub mod ledger;
pub mod lineage;
pub mod zk;

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Write `text` to `out`, or print it when no path is given.
pub fn write_or_print(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("OK: wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
