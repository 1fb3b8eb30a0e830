//! # sigil CLI entry point
//!
//! Parses command-line arguments, loads the optional YAML config and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sigil_cli::config::CliConfig;
use sigil_cli::container::{run_container, ContainerArgs};
use sigil_cli::hash::{run_hash, HashArgs};
use sigil_cli::kai::{run_kai, KaiArgs};
use sigil_cli::ledger::{run_ledger, LedgerArgs};
use sigil_cli::lineage::{run_lineage, LineageArgs};
use sigil_cli::zk::{run_zk, ZkArgs};

/// Sigil engine toolchain.
///
/// Kai time, canonical hashing, Poseidon membership proofs, sealed SVG
/// containers, lineage and the local ledger.
#[derive(Parser, Debug)]
#[command(name = "sigil", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Kai moments and calendar placement.
    Kai(KaiArgs),

    /// Canonical hash of a JSON document.
    Hash(HashArgs),

    /// Poseidon hashing and Groth16 membership proofs.
    Zk(ZkArgs),

    /// Seal payloads into SVG documents and open them again.
    Container(ContainerArgs),

    /// Derive and verify child sigils.
    Lineage(LineageArgs),

    /// Inspect and mutate the local ledger.
    Ledger(LedgerArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Kai(args) => run_kai(args),
        Commands::Hash(args) => run_hash(args),
        Commands::Zk(args) => run_zk(args, &config),
        Commands::Container(args) => run_container(args),
        Commands::Lineage(args) => run_lineage(args),
        Commands::Ledger(args) => run_ledger(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
