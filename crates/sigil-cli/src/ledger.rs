//! # Ledger Subcommand
//!
//! Inspect and mutate the file-backed ledger. Every invocation builds a
//! registry over the same directory, so concurrent invocations converge
//! the same way browser contexts sharing storage do.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use sigil_core::kai::moment_now;
use sigil_core::KaiMoment;
use sigil_ledger::{
    FileStorage, LedgerEventKind, LedgerRefs, LedgerRegistry, NewLedgerEvent, Persistence,
    RootRecord, TokioBroadcast,
};

use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Ledger directory. Overrides the config's `ledger_dir`.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Print roots and events, optionally for one root.
    List {
        #[arg(long)]
        root: Option<String>,
        /// Only the most recent event of the root.
        #[arg(long, requires = "root")]
        latest: bool,
    },
    /// Record a value-moving event.
    Record {
        /// DEPOSIT, WITHDRAW, LOCK, UNLOCK or CLAIM.
        #[arg(long)]
        kind: LedgerEventKind,
        #[arg(long)]
        root: String,
        #[arg(long)]
        root_hash: String,
        /// Vault, lock or claim id the movement belongs to.
        #[arg(long)]
        ref_id: String,
        /// Signed micro-phi delta.
        #[arg(long, allow_hyphen_values = true)]
        delta: String,
        /// Balance after the movement, in micro-phi.
        #[arg(long)]
        balance: String,
        /// Defaults to now.
        #[arg(long)]
        pulse: Option<u64>,
        #[arg(long)]
        user_phi_key: Option<String>,
    },
    /// Remove a root and all of its events.
    Clear {
        #[arg(value_name = "ROOT")]
        root: String,
    },
}

/// Registry over `dir`, synced from whatever is already stored there.
pub fn open_registry(dir: &Path) -> LedgerRegistry {
    tracing::debug!(dir = %dir.display(), "opening ledger");
    LedgerRegistry::new(
        Arc::new(FileStorage::new(dir)),
        Arc::new(TokioBroadcast::new()),
    )
}

fn report_persistence(persistence: &Persistence) -> u8 {
    match persistence {
        Persistence::MemoryOnly(reason) => {
            tracing::error!(%reason, "ledger change was not written to disk");
            1
        }
        Persistence::Persisted | Persistence::Unchanged => 0,
    }
}

pub fn run_ledger(args: &LedgerArgs, config: &CliConfig) -> Result<u8> {
    let dir = config.ledger_dir(args.dir.as_deref());
    let registry = open_registry(&dir);

    match &args.command {
        LedgerCommand::List { root, latest } => {
            match (root, latest) {
                (Some(root), true) => {
                    let event = registry
                        .latest_for_root(root)
                        .ok_or_else(|| anyhow!("no events for root {root}"))?;
                    crate::print_json(&event)?;
                }
                (Some(root), false) => crate::print_json(&registry.events_for_root(root))?,
                (None, _) => crate::print_json(&registry.snapshot())?,
            }
            Ok(0)
        }
        LedgerCommand::Record {
            kind,
            root,
            root_hash,
            ref_id,
            delta,
            balance,
            pulse,
            user_phi_key,
        } => {
            let moment = match pulse {
                Some(p) => KaiMoment::from_pulse(*p),
                None => moment_now()?,
            };
            let root_outcome = registry.record_root(RootRecord {
                root_sigil_id: root.clone(),
                root_svg_hash: root_hash.clone(),
                user_phi_key: user_phi_key.clone(),
                kai_signature: None,
                last_seen_pulse: Some(moment.pulse),
            });
            let refs = match kind {
                LedgerEventKind::Lock | LedgerEventKind::Unlock => LedgerRefs {
                    lock_id: Some(ref_id.clone()),
                    ..LedgerRefs::default()
                },
                LedgerEventKind::Claim => LedgerRefs {
                    claim_id: Some(ref_id.clone()),
                    ..LedgerRefs::default()
                },
                LedgerEventKind::Deposit | LedgerEventKind::Withdraw => LedgerRefs {
                    vault_id: Some(ref_id.clone()),
                    ..LedgerRefs::default()
                },
            };
            let outcome = registry.record_event(NewLedgerEvent {
                kind: *kind,
                root_sigil_id: root.clone(),
                root_svg_hash: root_hash.clone(),
                kai_moment: moment,
                delta_phi_micro: delta.clone(),
                resulting_balance_micro: balance.clone(),
                ref_id: ref_id.clone(),
                refs: Some(refs),
                hashes: None,
            })?;
            if outcome.inserted {
                println!("OK: recorded {}", outcome.event.event_id);
            } else {
                println!("OK: already recorded {}", outcome.event.event_id);
            }
            let root_code = root_outcome.map_or(0, |r| report_persistence(&r.persistence));
            Ok(report_persistence(&outcome.persistence).max(root_code))
        }
        LedgerCommand::Clear { root } => {
            let outcome = registry.clear_root(root);
            println!(
                "OK: cleared {root} (root {}, {} event(s) removed)",
                if outcome.root_removed { "removed" } else { "absent" },
                outcome.events_removed
            );
            Ok(report_persistence(&outcome.persistence))
        }
    }
}
