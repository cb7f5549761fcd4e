//! ASLR xtask - developer commands around the harness
//!
//! Resolves a harness configuration from flags and environment, runs the
//! two-boot check, and decodes captured console logs offline.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use aslr_harness::summary::{divergence_table, report_table, to_json};
use aslr_harness::{default_runner, extract_report, AddressReport, DivergenceReport, HarnessConfig};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// Pick the runner program: an explicit runner wins over the source tree.
pub fn resolve_runner(runner: Option<PathBuf>, base: Option<PathBuf>) -> Result<PathBuf> {
    match (runner, base) {
        (Some(runner), _) => Ok(runner),
        (None, Some(base)) => Ok(default_runner(&base)),
        (None, None) => bail!(
            "No runner configured: pass --runner or --base (or set ASLR_RUNNER / OSV_BASE)"
        ),
    }
}

/// Read a captured console log and decode its address report.
pub fn extract_log(path: &Path, marker: &str) -> Result<AddressReport> {
    let output = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read console log: {}", path.display()))?;
    extract_report(&output, marker)
        .with_context(|| format!("No usable address report in {}", path.display()))
}

pub fn render_report(report: &AddressReport, format: Format) -> Result<String> {
    match format {
        Format::Table => Ok(report_table(report)),
        Format::Json => to_json(report).context("Failed to encode report"),
    }
}

pub fn render_divergence(result: &DivergenceReport, format: Format) -> Result<String> {
    match format {
        Format::Table => Ok(divergence_table(result)),
        Format::Json => to_json(result).context("Failed to encode comparison"),
    }
}

/// Run the two-boot check, print the comparison, and fail on collisions.
pub fn run_check(config: &HarnessConfig, format: Format) -> Result<()> {
    println!(
        "🧪 Booting {} twice with {}",
        config.runner.image,
        config.runner.program.display()
    );

    let result = aslr_harness::check(config).context("ASLR check could not run")?;
    println!("{}", render_divergence(&result, format)?);

    // Chance collisions are possible; a rerun tells them apart from a
    // layout that is not randomized at all.
    result.check()?;
    println!("✅ ASLR check passed");
    Ok(())
}
