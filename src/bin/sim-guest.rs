//! Simulated guest runner.
//!
//! Usage: sim-guest -e tests/misc-aslr.so
//!
//! Prints a boot log followed by an `ADDRESS_LIST:` report, exactly like a
//! guest image booted by the real runner would.

use std::io::Write;

use anyhow::{Context, Result};
use aslr_smoke::{FixedEntropy, GuestLayout, Kaslr, SystemEntropy, GUEST_VERSION};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Boot a simulated guest image and print its address report.
#[derive(Parser)]
#[command(name = "sim-guest")]
struct Args {
    /// Image to execute.
    #[arg(short = 'e', long = "execute")]
    image: String,

    /// Use reproducible entropy; every boot with the same seed gets the
    /// same layout.
    #[arg(long, env = "SIM_GUEST_SEED")]
    seed: Option<u64>,

    /// Exit with this status after printing.
    #[arg(long, env = "SIM_GUEST_EXIT_CODE", default_value_t = 0)]
    exit_code: i32,
}

fn main() -> Result<()> {
    // stdout carries the console; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (layout, seed) = match args.seed {
        Some(fixed) => {
            tracing::warn!(seed = fixed, "address randomization disabled");
            let mut kaslr = Kaslr::new(GUEST_VERSION, FixedEntropy::new(fixed));
            (GuestLayout::boot(&mut kaslr), kaslr.seed())
        }
        None => {
            let mut kaslr = Kaslr::new(GUEST_VERSION, SystemEntropy);
            (GuestLayout::boot(&mut kaslr), kaslr.seed())
        }
    };
    tracing::debug!(image = %args.image, "guest layout ready");

    let console = layout
        .console_output(&args.image, seed)
        .context("Failed to encode address report")?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(console.as_bytes())
        .context("Failed to write console output")?;
    stdout.flush().context("Failed to flush console output")?;

    if args.exit_code != 0 {
        std::process::exit(args.exit_code);
    }
    Ok(())
}
