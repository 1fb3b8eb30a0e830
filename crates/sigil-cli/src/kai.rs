//! # Kai Subcommand
//!
//! Prints a Kai moment with its calendar placement and the UTC start of
//! its pulse.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use sigil_core::kai::{instant_from_pulse, moment_from_datetime, moment_from_instant, moment_now};
use sigil_core::KaiMoment;

#[derive(Args, Debug)]
pub struct KaiArgs {
    #[command(subcommand)]
    pub command: KaiCommand,
}

#[derive(Subcommand, Debug)]
pub enum KaiCommand {
    /// The moment for the current wall-clock time.
    Now,
    /// The moment for an instant: Unix milliseconds or RFC 3339.
    At {
        #[arg(value_name = "INSTANT")]
        instant: String,
    },
    /// The moment for a pulse number.
    Pulse {
        #[arg(value_name = "PULSE")]
        pulse: u64,
    },
}

pub fn run_kai(args: &KaiArgs) -> Result<u8> {
    let moment = match &args.command {
        KaiCommand::Now => moment_now()?,
        KaiCommand::At { instant } => parse_instant(instant)?,
        KaiCommand::Pulse { pulse } => KaiMoment::from_pulse(*pulse),
    };
    crate::print_json(&describe(&moment))?;
    Ok(0)
}

fn parse_instant(text: &str) -> Result<KaiMoment> {
    if let Ok(ms) = text.trim().parse::<f64>() {
        return Ok(moment_from_instant(ms)?);
    }
    let at: DateTime<Utc> = DateTime::parse_from_rfc3339(text.trim())
        .with_context(|| format!("instant {text:?} is neither milliseconds nor RFC 3339"))?
        .with_timezone(&Utc);
    Ok(moment_from_datetime(at)?)
}

/// JSON view of a moment.
pub fn describe(moment: &KaiMoment) -> Value {
    let start_ms = instant_from_pulse(moment.pulse as i64);
    let start = DateTime::<Utc>::from_timestamp_millis(start_ms.floor() as i64)
        .map(|t| t.to_rfc3339());
    json!({
        "moment": moment,
        "percentIntoStep": moment.percent_into_step(),
        "calendar": moment.calendar(),
        "pulseStartMs": start_ms,
        "pulseStartUtc": start,
    })
}
