//! # Lineage Subcommand
//!
//! Derive a child sigil under a root document, verify a child against its
//! claimed root, and build the claim payload for a settled position.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use sigil_core::kai::moment_now;
use sigil_core::KaiMoment;
use sigil_lineage::{
    canonical_svg_hash, render_child_document, verify_lineage, ClaimPayload, LineageContext,
    MicroAmount, Position, PositionClaim, VaultOwner,
};

#[derive(Args, Debug)]
pub struct LineageArgs {
    #[command(subcommand)]
    pub command: LineageCommand,
}

#[derive(Subcommand, Debug)]
pub enum LineageCommand {
    /// Render a child document bound to a root document.
    Derive {
        /// Root SVG the child descends from.
        #[arg(value_name = "ROOT_SVG")]
        root: PathBuf,
        #[arg(long)]
        market: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        side: String,
        /// Pulse of the derivation. Defaults to now.
        #[arg(long)]
        pulse: Option<u64>,
        /// Kai signature of the holder; the phi key is derived from it.
        #[arg(long)]
        kai_signature: Option<String>,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Check a child document's claim against a root document.
    Verify {
        #[arg(value_name = "CHILD_SVG")]
        child: PathBuf,
        #[arg(value_name = "ROOT_SVG")]
        root: PathBuf,
    },
    /// Build the claim payload for a settled position.
    Claim {
        /// Position JSON.
        #[arg(long)]
        position: PathBuf,
        /// Vault owner JSON (`userPhiKey`, `kaiSignature`, `identitySvgHash`).
        #[arg(long)]
        owner: PathBuf,
        /// Payout in micro-phi. Forced to zero for lost positions.
        #[arg(long, default_value_t = 0)]
        payout: u128,
        #[arg(long)]
        pulse: Option<u64>,
    },
}

pub fn run_lineage(args: &LineageArgs) -> Result<u8> {
    match &args.command {
        LineageCommand::Derive {
            root,
            market,
            position,
            side,
            pulse,
            kai_signature,
            out,
        } => {
            let context = LineageContext {
                market_id: market.clone(),
                position_id: position.clone(),
                side: side.clone(),
            };
            let child = derive_child(root, context, moment_at(*pulse)?, kai_signature.clone())?;
            crate::write_or_print(&child, out.as_deref())?;
            Ok(0)
        }
        LineageCommand::Verify { child, root } => {
            let report = verify_lineage(&crate::read_text(child)?, &crate::read_text(root)?);
            crate::print_json(&report)?;
            if report.ok {
                println!("OK: lineage verified");
                Ok(0)
            } else {
                for e in &report.errors {
                    tracing::warn!("{e}");
                }
                Ok(1)
            }
        }
        LineageCommand::Claim {
            position,
            owner,
            payout,
            pulse,
        } => {
            let position: Position = serde_json::from_value(crate::read_json(position)?)
                .with_context(|| format!("{} is not a position", position.display()))?;
            let owner: VaultOwner = serde_json::from_value(crate::read_json(owner)?)
                .with_context(|| format!("{} is not a vault owner", owner.display()))?;
            let claim =
                ClaimPayload::build(&position, &owner, moment_at(*pulse)?, MicroAmount(*payout))?;
            crate::print_json(&claim)?;
            Ok(0)
        }
    }
}

fn moment_at(pulse: Option<u64>) -> Result<KaiMoment> {
    Ok(match pulse {
        Some(p) => KaiMoment::from_pulse(p),
        None => moment_now()?,
    })
}

/// Render a child document for `context` under the root at `root_path`.
pub fn derive_child(
    root_path: &Path,
    context: LineageContext,
    moment: KaiMoment,
    kai_signature: Option<String>,
) -> Result<String> {
    let root_hash = canonical_svg_hash(&crate::read_text(root_path)?);
    let claim = PositionClaim::build(&root_hash, context, moment, kai_signature)?;
    tracing::info!(lineage_id = %claim.lineage_id, %root_hash, "derived child sigil");
    Ok(render_child_document(&claim)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LineageContext {
        LineageContext {
            market_id: "m1".into(),
            position_id: "p1".into(),
            side: "YES".into(),
        }
    }

    #[test]
    fn derived_child_verifies_against_its_root_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root.svg");
        let other = dir.path().join("other.svg");
        std::fs::write(&root, "<svg><metadata>{\"root\":1}</metadata></svg>").unwrap();
        std::fs::write(&other, "<svg><metadata>{\"root\":2}</metadata></svg>").unwrap();

        let child = derive_child(
            &root,
            context(),
            KaiMoment::from_pulse(9_000),
            Some("sig-test-1".into()),
        )
        .unwrap();
        let child_path = dir.path().join("child.svg");
        std::fs::write(&child_path, &child).unwrap();

        let ok = LineageArgs {
            command: LineageCommand::Verify {
                child: child_path.clone(),
                root,
            },
        };
        assert_eq!(run_lineage(&ok).unwrap(), 0);

        let bad = LineageArgs {
            command: LineageCommand::Verify {
                child: child_path,
                root: other,
            },
        };
        assert_eq!(run_lineage(&bad).unwrap(), 1);
    }

    #[test]
    fn claim_reads_position_and_owner_files() {
        let dir = tempfile::tempdir().unwrap();
        let position = dir.path().join("position.json");
        let owner = dir.path().join("owner.json");
        std::fs::write(
            &position,
            r#"{"id":"p","marketId":"m","entry":{"side":"YES","stakeMicro":"5","sharesMicro":"5",
                "openedAt":{"pulse":2,"beat":0,"stepIndex":0}},"status":"won"}"#,
        )
        .unwrap();
        std::fs::write(
            &owner,
            r#"{"userPhiKey":"phi","kaiSignature":"sig","identitySvgHash":"abc"}"#,
        )
        .unwrap();
        let args = LineageArgs {
            command: LineageCommand::Claim {
                position,
                owner,
                payout: 10,
                pulse: Some(50),
            },
        };
        assert_eq!(run_lineage(&args).unwrap(), 0);
    }
}
