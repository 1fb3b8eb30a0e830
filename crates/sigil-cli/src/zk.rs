//! # ZK Subcommand
//!
//! Poseidon hashing, membership proof generation and verification, and
//! export of the seeded key setup. Keys come from `--key-dir` (or the
//! config's `zk_key_dir`) when given, otherwise from the seeded setup for
//! the selected hash version.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use sigil_zkp::field::{field_to_decimal, secret_to_field};
use sigil_zkp::poseidon::hash_field;
use sigil_zkp::{zk_stamp, PoseidonVersion, ProverKeys, SigilProof, SigilProver};

use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct ZkArgs {
    /// Hash version: v1 or v2.
    #[arg(long, global = true)]
    pub hash_version: Option<PoseidonVersion>,
    /// Directory holding proving_key.bin and verifying_key.bin.
    #[arg(long, global = true)]
    pub key_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: ZkCommand,
}

#[derive(Subcommand, Debug)]
pub enum ZkCommand {
    /// Poseidon hash of a secret, as a decimal field element.
    Hash {
        #[arg(value_name = "SECRET")]
        secret: String,
    },
    /// Prove knowledge of a secret hashing to the expected value.
    Prove {
        #[arg(long)]
        secret: String,
        /// Expected hash. Defaults to the hash of the secret.
        #[arg(long)]
        expected: Option<String>,
        /// Write the proof JSON here instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Verify a proof JSON file (`{proof, publicSignals}`).
    Verify {
        #[arg(value_name = "PROOF_JSON")]
        file: PathBuf,
    },
    /// Export the seeded key setup for the selected version.
    Setup {
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Field secret and hash for a hex payload hash.
    Stamp {
        #[arg(value_name = "PAYLOAD_HASH_HEX")]
        payload_hash: String,
    },
}

pub fn run_zk(args: &ZkArgs, config: &CliConfig) -> Result<u8> {
    let version = config.hash_version(args.hash_version)?;
    let key_dir = config.zk_key_dir(args.key_dir.as_deref());
    match &args.command {
        ZkCommand::Hash { secret } => {
            println!("{}", poseidon_hash(secret, version)?);
            Ok(0)
        }
        ZkCommand::Prove {
            secret,
            expected,
            out,
        } => {
            let prover = load_prover(key_dir.as_deref(), version)?;
            let expected = match expected {
                Some(e) => e.clone(),
                None => prover.poseidon_hash(secret)?,
            };
            let proof = prover.prove(secret, &expected)?;
            let json = serde_json::to_string_pretty(&proof)?;
            crate::write_or_print(&json, out.as_deref())?;
            Ok(0)
        }
        ZkCommand::Verify { file } => {
            let proof: SigilProof = serde_json::from_value(crate::read_json(file)?)
                .with_context(|| format!("{} is not a proof document", file.display()))?;
            let prover = load_prover(key_dir.as_deref(), version)?;
            if prover.verify(&proof.public_signals, &proof.proof)? {
                println!("OK: proof verifies ({version})");
                Ok(0)
            } else {
                println!("FAIL: proof does not verify ({version})");
                Ok(1)
            }
        }
        ZkCommand::Setup { out } => {
            let keys = ProverKeys::deterministic(version)?;
            keys.save(out)
                .with_context(|| format!("failed to write keys to {}", out.display()))?;
            println!("OK: wrote {version} keys to {}", out.display());
            println!("  Verifying key fingerprint: {}", keys.fingerprint()?);
            Ok(0)
        }
        ZkCommand::Stamp { payload_hash } => {
            crate::print_json(&zk_stamp(payload_hash, version)?)?;
            Ok(0)
        }
    }
}

/// Hash without building proving keys.
pub fn poseidon_hash(secret: &str, version: PoseidonVersion) -> Result<String> {
    let secret = secret.trim();
    if secret.is_empty() {
        bail!("secret must not be empty");
    }
    Ok(field_to_decimal(&hash_field(version, secret_to_field(secret)?)))
}

fn load_prover(key_dir: Option<&Path>, version: PoseidonVersion) -> Result<SigilProver> {
    match key_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), %version, "loading proving keys");
            SigilProver::from_dir(dir, version)
                .with_context(|| format!("failed to load keys from {}", dir.display()))
        }
        None => {
            tracing::info!(%version, "using seeded key setup");
            Ok(SigilProver::deterministic(version)?)
        }
    }
}
