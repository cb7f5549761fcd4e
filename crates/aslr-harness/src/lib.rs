//! ASLR smoke-test harness
//!
//! Boots a guest image twice through an external runner, extracts the
//! address report the guest prints after `ADDRESS_LIST:`, and checks that
//! every reported region moved between the two boots.

mod compare;
mod config;
mod error;
mod report;
mod runner;
pub mod summary;

pub use compare::*;
pub use config::*;
pub use error::*;
pub use report::*;
pub use runner::*;

use tracing::info;

/// Boot twice, extract both reports and compare them.
///
/// The runs are strictly sequential. A failure in the first run aborts
/// before the second is started.
pub fn run_aslr_check<R: Runner + ?Sized>(
    runner: &R,
    marker: &str,
) -> Result<DivergenceReport, HarnessError> {
    let output1 = runner.run()?;
    let output2 = runner.run()?;

    let report1 = extract_report(&output1.stdout, marker)?;
    let report2 = extract_report(&output2.stdout, marker)?;
    info!(
        regions = report1.len(),
        "decoded address reports from both runs"
    );

    compare_reports(&report1, &report2)
}

/// Run the check described by `config` with a [`CommandRunner`].
pub fn check(config: &HarnessConfig) -> Result<DivergenceReport, HarnessError> {
    let runner = CommandRunner::new(config.runner.clone());
    run_aslr_check(&runner, &config.marker)
}
