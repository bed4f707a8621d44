//! Probe command: run the fallback chain once and report each attempt

use anyhow::{anyhow, Result};
use clap::Parser;

use catalog_server::db::{AttemptOutcome, AttemptRecord};

use super::DatabaseArgs;

/// Arguments for the probe command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Try every target in order and print the trial history.
///
/// Exits non-zero when nothing, not even the local fallback, connects.
pub async fn run_probe(args: ProbeArgs) -> Result<()> {
    let config = args.database.load_config()?;
    let supplier = config.database.supplier();

    println!(
        "Probing {} candidate(s), then {} ({:?} per attempt)",
        supplier.candidates().len(),
        supplier.local_fallback().redacted_url(),
        supplier.connect_timeout()
    );

    match supplier.acquire().await {
        Ok(acquired) => {
            print_history(&acquired.attempts);
            println!(
                "\nServing from '{}' ({}, {})",
                acquired.target, acquired.tier, acquired.driver
            );
            if !acquired.tier.is_durable() {
                println!("Warning: local fallback store is in-memory; data will not survive a restart");
            }
            Ok(())
        }
        Err(err) => {
            print_history(&err.attempts);
            Err(anyhow!(err))
        }
    }
}

fn print_history(attempts: &[AttemptRecord]) {
    for (i, attempt) in attempts.iter().enumerate() {
        let status = match &attempt.outcome {
            AttemptOutcome::Connected { elapsed_ms } => format!("ok ({}ms)", elapsed_ms),
            AttemptOutcome::Failed { reason } => format!("failed: {}", reason),
        };
        println!("  {}. {} [{}] {}", i + 1, attempt.target, attempt.tier, status);
    }
}
