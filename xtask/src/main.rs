use std::path::PathBuf;

use anyhow::Result;
use aslr_harness::{HarnessConfig, DEFAULT_EXECUTE_FLAG, DEFAULT_IMAGE, DEFAULT_MARKER};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xtask::{extract_log, render_report, resolve_runner, run_check, Format};

/// ASLR smoke-test developer tasks.
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Boot the image twice and check that every region moved.
    Check(CheckArgs),
    /// Decode the address report from a captured console log.
    Extract(ExtractArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Runner program that boots the image.
    #[arg(long, env = "ASLR_RUNNER")]
    runner: Option<PathBuf>,

    /// Guest source tree; its scripts/run.py is the default runner.
    #[arg(long, env = "OSV_BASE")]
    base: Option<PathBuf>,

    /// Flag passed to the runner before the image.
    #[arg(long, default_value = DEFAULT_EXECUTE_FLAG, allow_hyphen_values = true)]
    execute_flag: String,

    /// Image to boot.
    #[arg(long, env = "ASLR_IMAGE", default_value = DEFAULT_IMAGE)]
    image: String,

    /// Marker preceding the address report.
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(Args)]
struct ExtractArgs {
    /// Captured console log.
    log: PathBuf,

    /// Marker preceding the address report.
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().cmd {
        Cmd::Check(args) => check(args),
        Cmd::Extract(args) => extract(args),
    }
}

fn check(args: CheckArgs) -> Result<()> {
    let program = resolve_runner(args.runner, args.base)?;
    let config = HarnessConfig::new(program)
        .with_execute_flag(args.execute_flag)
        .with_image(args.image)
        .with_marker(args.marker);
    run_check(&config, args.format)
}

fn extract(args: ExtractArgs) -> Result<()> {
    let report = extract_log(&args.log, &args.marker)?;
    println!("{}", render_report(&report, args.format)?);
    Ok(())
}
